//! Pairing-based key encapsulation bound to an epoch identity.

use ark_bls12_381::{G1Affine, G2Affine};
use ark_ec::CurveGroup;
use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use crate::{
    error::Result,
    group::{self, G1_BYTES, G2_BYTES, Gt},
    hierarchy::{NodeKey, PublicParams},
};

/// Encoded size of an [`Encapsulation`].
pub const ENCAPSULATION_BYTES: usize = G2_BYTES + G1_BYTES;

/// Encapsulated shared secret `(s * g, s * H(w))` for epoch node `w`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encapsulation {
    ca: G2Affine,
    cb: G1Affine,
}

impl Encapsulation {
    /// Encapsulate a fresh shared secret `e(g2, g1)^s` to `identity`.
    ///
    /// # Errors
    ///
    /// - `RngFailure` if sampling `s` fails
    pub fn encapsulate<R: RngCore + CryptoRng>(
        gt_base: &Gt,
        identity: G1Affine,
        rng: &mut R,
    ) -> Result<(Self, Gt)> {
        let mut s = group::random_scalar(rng)?;

        let ca = (PublicParams::get().g() * s).into_affine();
        let cb = (identity * s).into_affine();
        let shared = *gt_base * s;

        s.zeroize();
        Ok((Self { ca, cb }, shared))
    }

    /// Recover the shared secret with the node key for the same identity.
    ///
    /// A key for any other node yields an unrelated value.
    pub fn decapsulate(&self, key: &NodeKey) -> Gt {
        key.decapsulate(self.ca, self.cb)
    }

    /// Fixed-size encoding: `ca (96) || cb (48)`.
    pub fn to_bytes(&self) -> [u8; ENCAPSULATION_BYTES] {
        let mut buf = Vec::with_capacity(ENCAPSULATION_BYTES);
        group::encode_g2(&self.ca, &mut buf);
        group::encode_g1(&self.cb, &mut buf);

        let Ok(bytes) = buf.try_into() else {
            unreachable!("compressed points have fixed sizes");
        };
        bytes
    }

    /// Decode and validate both points.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyEncoding` if either point is malformed, outside its
    ///   subgroup, or the identity
    pub fn from_bytes(bytes: &[u8; ENCAPSULATION_BYTES]) -> Result<Self> {
        let (ca, cb) = bytes.split_at(G2_BYTES);
        Ok(Self {
            ca: group::decode_g2(ca, "encapsulation.ca")?,
            cb: group::decode_g1(cb, "encapsulation.cb")?,
        })
    }
}
