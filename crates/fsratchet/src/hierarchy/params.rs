//! Public parameters of the key hierarchy.
//!
//! All generators are hashed to G1 from fixed labels, so anyone can recompute
//! them and nobody knows their discrete logarithms. They are shared by every
//! key pair; only the master element `g1 = alpha * g` is per key pair.

use std::sync::OnceLock;

use ark_bls12_381::{Fr, G1Affine, G1Projective, G2Affine};
use ark_ec::{AffineRepr, CurveGroup};

use crate::{config::MAX_DEPTH, group, tree::NodeName};

/// Domain separation tag for parameter generation
const PARAMS_DOMAIN: &[u8] = b"fsratchet-v1/params";

static PARAMS: OnceLock<PublicParams> = OnceLock::new();

/// Hashed generators shared by all key pairs.
#[derive(Debug)]
pub struct PublicParams {
    /// Generator of G2
    g: G2Affine,
    /// Pairs with the master element to form the encapsulation base
    g2: G1Affine,
    /// Identity element of the root
    g3: G1Affine,
    /// One generator per tree level, `h[i]` is used at level `i + 1`
    h: Vec<G1Affine>,
}

impl PublicParams {
    /// Process-wide parameters, derived on first use.
    pub fn get() -> &'static Self {
        PARAMS.get_or_init(Self::derive)
    }

    fn derive() -> Self {
        let h = (1..=MAX_DEPTH)
            .map(|level| hash_label(format!("h{level}").as_bytes()))
            .collect();

        Self { g: G2Affine::generator(), g2: hash_label(b"g2"), g3: hash_label(b"g3"), h }
    }

    /// Generator of G2.
    pub fn g(&self) -> G2Affine {
        self.g
    }

    /// Element raised to the master secret in every node key.
    pub fn g2(&self) -> G1Affine {
        self.g2
    }

    /// Generator for tree level `level` (1-based).
    pub fn h(&self, level: u8) -> G1Affine {
        debug_assert!(level >= 1 && level <= MAX_DEPTH);
        self.h[usize::from(level) - 1]
    }

    /// Weight of a direction bit inside an identity (never zero).
    pub fn bit_weight(bit: u8) -> Fr {
        Fr::from(u64::from(bit) + 1)
    }

    /// Identity element of `node`: `g3 + sum((bit_i + 1) * h_i)`.
    ///
    /// This is the only per-epoch public value. Ciphertexts for an epoch are
    /// bound to it, and node keys carry a matching component.
    pub fn identity(&self, node: NodeName) -> G1Affine {
        let mut acc = G1Projective::from(self.g3);
        for (level, bit) in (1..=node.level()).zip(node.bits()) {
            let h = self.h(level);
            acc += h;
            if bit == 1 {
                acc += h;
            }
        }
        acc.into_affine()
    }
}

fn hash_label(label: &[u8]) -> G1Affine {
    group::hash_to_g1(PARAMS_DOMAIN, label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_are_stable() {
        let a = PublicParams::get();
        let b = PublicParams::derive();
        assert_eq!(a.g2, b.g2);
        assert_eq!(a.g3, b.g3);
        assert_eq!(a.h, b.h);
    }

    #[test]
    fn generators_are_distinct() {
        let params = PublicParams::get();
        assert_ne!(params.g2, params.g3);
        for level in 1..=MAX_DEPTH {
            assert_ne!(params.h(level), params.g3);
            if level > 1 {
                assert_ne!(params.h(level), params.h(level - 1));
            }
        }
    }

    #[test]
    fn root_identity_is_g3() {
        let params = PublicParams::get();
        assert_eq!(params.identity(NodeName::ROOT), params.g3);
    }

    #[test]
    fn identity_uses_weighted_generators() {
        let params = PublicParams::get();
        let node = NodeName::ROOT.left().right();

        let expected = (G1Projective::from(params.g3)
            + params.h(1) * PublicParams::bit_weight(0)
            + params.h(2) * PublicParams::bit_weight(1))
        .into_affine();
        assert_eq!(params.identity(node), expected);
    }

    #[test]
    fn sibling_identities_differ() {
        let params = PublicParams::get();
        let left = params.identity(NodeName::ROOT.left());
        let right = params.identity(NodeName::ROOT.right());
        assert_ne!(left, right);
    }
}
