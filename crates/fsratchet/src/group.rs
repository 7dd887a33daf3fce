//! BLS12-381 group arithmetic.
//!
//! Thin layer over arkworks. Uses the type-3 pairing `e: G1 x G2 -> GT`.
//! Scalar multiplication and point addition are the arkworks operators;
//! this module adds the pieces with crate-specific policy: entropy handling,
//! domain-separated hashing to G1, and strict fixed-size point codecs.

use ark_bls12_381::{Bls12_381, Fr, G1Affine, G1Projective, G2Affine, g1};
use ark_ec::{
    AffineRepr,
    hashing::{HashToCurve, curve_maps::wb::WBMap, map_to_curve_hasher::MapToCurveBasedHasher},
    pairing::{Pairing, PairingOutput},
};
use ark_ff::{PrimeField, Zero, field_hashers::DefaultFieldHasher};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use rand::{CryptoRng, RngCore};
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use crate::error::{RatchetError, Result};

/// Target group of the pairing.
pub type Gt = PairingOutput<Bls12_381>;

/// Compressed size of a G1 element.
pub const G1_BYTES: usize = 48;

/// Compressed size of a G2 element.
pub const G2_BYTES: usize = 96;

/// Random bytes reduced into one scalar (twice the field size, so the
/// modular bias is negligible).
const WIDE_SCALAR_BYTES: usize = 64;

type G1Hasher = MapToCurveBasedHasher<G1Projective, DefaultFieldHasher<Sha256, 128>, WBMap<g1::Config>>;

/// Sample a uniformly random non-zero scalar.
///
/// # Errors
///
/// - `RngFailure` if the RNG cannot produce bytes
pub fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Fr> {
    let mut wide = [0u8; WIDE_SCALAR_BYTES];
    loop {
        let filled = rng.try_fill_bytes(&mut wide);
        let scalar = Fr::from_le_bytes_mod_order(&wide);
        wide.zeroize();

        filled.map_err(|e| RatchetError::RngFailure { reason: e.to_string() })?;
        if !scalar.is_zero() {
            return Ok(scalar);
        }
    }
}

/// Hash `msg` to G1 under the domain separation tag `domain`.
///
/// Uses the RFC 9380 simplified SWU map for BLS12-381 G1 with SHA-256.
/// `domain` must be a crate constant of at most 255 bytes.
pub fn hash_to_g1(domain: &[u8], msg: &[u8]) -> G1Affine {
    debug_assert!(!domain.is_empty() && domain.len() <= 255);

    let Ok(hasher) = G1Hasher::new(domain) else {
        unreachable!("WB map for BLS12-381 G1 is always constructible");
    };
    let Ok(point) = hasher.hash(msg) else {
        unreachable!("hash-to-curve cannot fail for a valid domain tag");
    };
    point
}

/// Pairing of one G1 and one G2 element.
pub fn pairing(p: G1Affine, q: G2Affine) -> Gt {
    Bls12_381::pairing(p, q)
}

/// Product of `N` pairings, sharing a single final exponentiation.
pub fn multi_pairing<const N: usize>(p: [G1Affine; N], q: [G2Affine; N]) -> Gt {
    Bls12_381::multi_pairing(p, q)
}

/// Append the compressed encoding of a G1 element.
pub fn encode_g1(point: &G1Affine, out: &mut Vec<u8>) {
    let Ok(()) = point.serialize_compressed(&mut *out) else {
        unreachable!("writing to a Vec cannot fail");
    };
}

/// Append the compressed encoding of a G2 element.
pub fn encode_g2(point: &G2Affine, out: &mut Vec<u8>) {
    let Ok(()) = point.serialize_compressed(&mut *out) else {
        unreachable!("writing to a Vec cannot fail");
    };
}

/// Decode a compressed G1 element.
///
/// # Errors
///
/// - `InvalidKeyEncoding` if `bytes` is not exactly [`G1_BYTES`] long, is
///   not a canonical point encoding, is outside the prime-order subgroup, or
///   is the identity
pub fn decode_g1(bytes: &[u8], element: &'static str) -> Result<G1Affine> {
    if bytes.len() != G1_BYTES {
        return Err(RatchetError::InvalidKeyEncoding { element });
    }

    let point = G1Affine::deserialize_compressed(bytes)
        .map_err(|_| RatchetError::InvalidKeyEncoding { element })?;

    if point.is_zero() {
        return Err(RatchetError::InvalidKeyEncoding { element });
    }
    Ok(point)
}

/// Decode a compressed G2 element.
///
/// # Errors
///
/// - `InvalidKeyEncoding` under the same conditions as [`decode_g1`]
pub fn decode_g2(bytes: &[u8], element: &'static str) -> Result<G2Affine> {
    if bytes.len() != G2_BYTES {
        return Err(RatchetError::InvalidKeyEncoding { element });
    }

    let point = G2Affine::deserialize_compressed(bytes)
        .map_err(|_| RatchetError::InvalidKeyEncoding { element })?;

    if point.is_zero() {
        return Err(RatchetError::InvalidKeyEncoding { element });
    }
    Ok(point)
}

/// Canonical bytes of a GT element, for key derivation only.
pub fn gt_bytes(value: &Gt) -> Zeroizing<Vec<u8>> {
    let mut bytes = Zeroizing::new(Vec::with_capacity(value.compressed_size()));
    let Ok(()) = value.serialize_compressed(&mut *bytes) else {
        unreachable!("writing to a Vec cannot fail");
    };
    bytes
}

#[cfg(test)]
mod tests {
    use ark_ec::CurveGroup;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::testing::FailingRng;

    #[test]
    fn random_scalars_differ() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let a = random_scalar(&mut rng).unwrap();
        let b = random_scalar(&mut rng).unwrap();
        assert_ne!(a, b);
        assert!(!a.is_zero());
    }

    #[test]
    fn rng_failure_is_reported() {
        let result = random_scalar(&mut FailingRng);
        assert!(matches!(result, Err(RatchetError::RngFailure { .. })));
    }

    #[test]
    fn hash_to_g1_is_deterministic_and_separated() {
        let a = hash_to_g1(b"fsratchet-test", b"label");
        let b = hash_to_g1(b"fsratchet-test", b"label");
        let c = hash_to_g1(b"fsratchet-test", b"other");
        let d = hash_to_g1(b"fsratchet-other", b"label");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert!(a.is_in_correct_subgroup_assuming_on_curve());
    }

    #[test]
    fn pairing_is_bilinear() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let x = random_scalar(&mut rng).unwrap();
        let y = random_scalar(&mut rng).unwrap();

        let p = (G1Affine::generator() * x).into_affine();
        let q = (G2Affine::generator() * y).into_affine();

        let lhs = pairing(p, q);
        let rhs = pairing(G1Affine::generator(), G2Affine::generator()) * (x * y);
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn multi_pairing_cancels_inverse_pair() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let x = random_scalar(&mut rng).unwrap();
        let p = (G1Affine::generator() * x).into_affine();
        let q = G2Affine::generator();

        assert!(multi_pairing([p, -p], [q, q]).is_zero());
    }

    #[test]
    fn point_encoding_roundtrip() {
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let x = random_scalar(&mut rng).unwrap();
        let p = (G1Affine::generator() * x).into_affine();
        let q = (G2Affine::generator() * x).into_affine();

        let mut bytes = Vec::new();
        encode_g1(&p, &mut bytes);
        assert_eq!(bytes.len(), G1_BYTES);
        assert_eq!(decode_g1(&bytes, "p").unwrap(), p);

        bytes.clear();
        encode_g2(&q, &mut bytes);
        assert_eq!(bytes.len(), G2_BYTES);
        assert_eq!(decode_g2(&bytes, "q").unwrap(), q);
    }

    #[test]
    fn decode_rejects_wrong_length() {
        assert_eq!(
            decode_g1(&[0u8; G1_BYTES - 1], "p"),
            Err(RatchetError::InvalidKeyEncoding { element: "p" })
        );
        assert_eq!(
            decode_g2(&[0u8; G2_BYTES + 1], "q"),
            Err(RatchetError::InvalidKeyEncoding { element: "q" })
        );
    }

    #[test]
    fn decode_rejects_garbage_and_identity() {
        assert!(decode_g1(&[0xFF; G1_BYTES], "p").is_err());

        let mut identity = Vec::new();
        encode_g1(&G1Affine::zero(), &mut identity);
        assert_eq!(
            decode_g1(&identity, "p"),
            Err(RatchetError::InvalidKeyEncoding { element: "p" })
        );
    }

    #[test]
    fn gt_bytes_are_canonical() {
        let value = pairing(G1Affine::generator(), G2Affine::generator());
        assert_eq!(gt_bytes(&value).as_slice(), gt_bytes(&value).as_slice());
        assert_eq!(gt_bytes(&value).len(), 576);
    }
}
