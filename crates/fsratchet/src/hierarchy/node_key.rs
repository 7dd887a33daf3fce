//! Secret keys of individual tree nodes.
//!
//! A node key for node `w` at level `k` is
//!
//! ```text
//! a0 = alpha * g2 + r * H(w)      (G1)
//! a1 = r * g                      (G2)
//! b_j = r * h_j   for k < j <= D  (G1)
//! ```
//!
//! where `H(w)` is the node's identity element and `r` is fresh per key. The
//! `b_j` components let the holder derive keys for the node's children, so a
//! node key can decrypt for every epoch in its subtree. Leaves have no `b_j`.

use ark_bls12_381::{Fr, G1Affine, G1Projective, G2Affine};
use ark_ec::{CurveGroup, VariableBaseMSM};
use ark_ff::{PrimeField, Zero};
use hmac::{Hmac, Mac};
use rand::{CryptoRng, RngCore};
use sha2::Sha256;
use zeroize::Zeroize;

use super::params::PublicParams;
use crate::{
    error::Result,
    group::{self, Gt},
    tree::NodeName,
};

type HmacSha256 = Hmac<Sha256>;

/// Key for deriving batch verification coefficients
const BATCH_LABEL: &[u8] = b"fsratchet-v1/batch";

/// Secret key of one tree node.
///
/// Zeroized on drop. Not `Clone`: a node key is moved between the stack and
/// its replacement, never duplicated.
pub struct NodeKey {
    node: NodeName,
    a0: G1Affine,
    a1: G2Affine,
    b: Vec<G1Affine>,
}

impl NodeKey {
    /// Root key for a fresh key pair with master secret `alpha`.
    ///
    /// The caller keeps `alpha` only long enough to publish `alpha * g`.
    pub(crate) fn root<R: RngCore + CryptoRng>(
        alpha: &Fr,
        depth: u8,
        rng: &mut R,
    ) -> Result<Self> {
        let params = PublicParams::get();
        let mut r = group::random_scalar(rng)?;

        let a0 = (params.g2() * alpha + params.identity(NodeName::ROOT) * r).into_affine();
        let a1 = (params.g() * r).into_affine();
        let b = (1..=depth).map(|level| (params.h(level) * r).into_affine()).collect();

        r.zeroize();
        Ok(Self { node: NodeName::ROOT, a0, a1, b })
    }

    /// Assemble a key from decoded parts. Validity is checked by [`verify`].
    ///
    /// [`verify`]: Self::verify
    pub(crate) fn from_parts(node: NodeName, a0: G1Affine, a1: G2Affine, b: Vec<G1Affine>) -> Self {
        Self { node, a0, a1, b }
    }

    /// Tree node this key belongs to.
    pub fn node(&self) -> NodeName {
        self.node
    }

    /// First component (`alpha * g2 + r * H(w)`).
    pub(crate) fn a0(&self) -> &G1Affine {
        &self.a0
    }

    /// Second component (`r * g`).
    pub(crate) fn a1(&self) -> &G2Affine {
        &self.a1
    }

    /// Delegation components for the levels below this node.
    pub(crate) fn delegation(&self) -> &[G1Affine] {
        &self.b
    }

    /// Derive the key of the child in direction `bit`.
    ///
    /// Re-randomizes with a fresh scalar `t`, so the child key is distributed
    /// exactly like a freshly generated key for that node:
    ///
    /// ```text
    /// a0' = a0 + (bit + 1) * b_{k+1} + t * H(child)
    /// a1' = a1 + t * g
    /// b_j' = b_j + t * h_j
    /// ```
    pub(crate) fn derive_child<R: RngCore + CryptoRng>(&self, bit: u8, rng: &mut R) -> Result<Self> {
        let Some((first, rest)) = self.b.split_first() else {
            unreachable!("derive_child is never called on a leaf key");
        };

        let params = PublicParams::get();
        let child = self.node.child(bit);
        let mut t = group::random_scalar(rng)?;

        let a0 = (G1Projective::from(self.a0)
            + *first * PublicParams::bit_weight(bit)
            + params.identity(child) * t)
            .into_affine();
        let a1 = (params.g() * t + self.a1).into_affine();

        let first_level = child.level() + 1;
        let b = rest
            .iter()
            .zip(first_level..)
            .map(|(b_j, level)| (params.h(level) * t + b_j).into_affine())
            .collect();

        t.zeroize();
        Ok(Self { node: child, a0, a1, b })
    }

    /// Recover the encapsulated GT element for this node's identity.
    ///
    /// For an encapsulation `(s * g, s * H(w))` this computes
    /// `e(a0, s*g) / e(s*H(w), a1) = e(g2, g1)^s`.
    pub(crate) fn decapsulate(&self, ca: G2Affine, cb: G1Affine) -> Gt {
        group::multi_pairing([self.a0, -cb], [ca, self.a1])
    }

    /// Check this key against the public master element, using only public
    /// parameters.
    ///
    /// Verifies `e(a0, g) = e(g2, g1) * e(H(w), a1)` and, for every
    /// delegation component, `e(b_j, g) = e(h_j, a1)`. The delegation checks
    /// are batched into a single equation with coefficients derived from
    /// `transcript` (the encoded key).
    pub(crate) fn verify(&self, gt_base: &Gt, transcript: &[u8]) -> bool {
        let params = PublicParams::get();
        let identity = params.identity(self.node);

        if group::multi_pairing([self.a0, -identity], [params.g(), self.a1]) != *gt_base {
            return false;
        }

        if self.b.is_empty() {
            return true;
        }

        let coefficients = batch_coefficients(transcript, self.b.len());
        let first_level = self.node.level() + 1;
        let generators: Vec<G1Affine> =
            (first_level..first_level + self.b.len() as u8).map(|level| params.h(level)).collect();

        let (Ok(lhs), Ok(rhs)) = (
            G1Projective::msm(&self.b, &coefficients),
            G1Projective::msm(&generators, &coefficients),
        ) else {
            return false;
        };

        group::multi_pairing([lhs.into_affine(), -rhs.into_affine()], [params.g(), self.a1])
            .is_zero()
    }
}

impl Zeroize for NodeKey {
    fn zeroize(&mut self) {
        self.a0.zeroize();
        self.a1.zeroize();
        self.b.iter_mut().for_each(Zeroize::zeroize);
        self.b.clear();
    }
}

impl Drop for NodeKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl std::fmt::Debug for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeKey").field("node", &self.node).finish_non_exhaustive()
    }
}

/// Random-linear-combination coefficients for batch verification.
fn batch_coefficients(transcript: &[u8], count: usize) -> Vec<Fr> {
    (0..count as u32)
        .map(|index| {
            let Ok(mut mac) = HmacSha256::new_from_slice(BATCH_LABEL) else {
                unreachable!("HMAC-SHA256 accepts any key size");
            };
            mac.update(transcript);
            mac.update(&index.to_be_bytes());
            let digest = mac.finalize().into_bytes();
            Fr::from_le_bytes_mod_order(&digest)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use ark_ec::AffineRepr;

    use super::*;
    use crate::testing::root_key as keypair;

    #[test]
    fn root_key_has_delegation_for_every_level() {
        let (root, _, _) = keypair(4, 1);
        assert_eq!(root.node(), NodeName::ROOT);
        assert_eq!(root.delegation().len(), 4);
    }

    #[test]
    fn root_key_verifies() {
        let (root, gt_base, _) = keypair(4, 2);
        assert!(root.verify(&gt_base, b"root"));
    }

    #[test]
    fn derived_keys_verify() {
        let (root, gt_base, mut rng) = keypair(3, 3);
        let left = root.derive_child(0, &mut rng).unwrap();
        let right = root.derive_child(1, &mut rng).unwrap();
        let leaf = left.derive_child(1, &mut rng).unwrap().derive_child(0, &mut rng).unwrap();

        assert_eq!(left.node(), NodeName::ROOT.left());
        assert_eq!(right.node(), NodeName::ROOT.right());
        assert_eq!(leaf.delegation().len(), 0);

        assert!(left.verify(&gt_base, b"left"));
        assert!(right.verify(&gt_base, b"right"));
        assert!(leaf.verify(&gt_base, b"leaf"));
    }

    #[test]
    fn key_for_wrong_node_fails_verification() {
        let (root, gt_base, mut rng) = keypair(3, 4);
        let left = root.derive_child(0, &mut rng).unwrap();

        let relabeled = NodeKey::from_parts(
            NodeName::ROOT.right(),
            *left.a0(),
            *left.a1(),
            left.delegation().to_vec(),
        );
        assert!(!relabeled.verify(&gt_base, b"relabeled"));
    }

    #[test]
    fn corrupted_delegation_fails_verification() {
        let (root, gt_base, _) = keypair(3, 5);
        let mut b = root.delegation().to_vec();
        b[1] = G1Affine::generator();

        let corrupted = NodeKey::from_parts(NodeName::ROOT, *root.a0(), *root.a1(), b);
        assert!(!corrupted.verify(&gt_base, b"corrupted"));
    }

    #[test]
    fn decapsulation_matches_encapsulation() {
        let (root, gt_base, mut rng) = keypair(3, 6);
        let node_key = root.derive_child(1, &mut rng).unwrap();
        let params = PublicParams::get();

        let s = group::random_scalar(&mut rng).unwrap();
        let ca = (params.g() * s).into_affine();
        let cb = (params.identity(node_key.node()) * s).into_affine();

        assert_eq!(node_key.decapsulate(ca, cb), gt_base * s);
        assert_ne!(root.decapsulate(ca, cb), gt_base * s);
    }

    #[test]
    fn zeroize_clears_components() {
        let (mut root, _, _) = keypair(2, 7);
        root.zeroize();
        assert!(root.delegation().is_empty());
    }
}
