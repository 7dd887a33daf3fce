//! Shared helpers for unit tests.

use ark_ec::CurveGroup;
use rand::{CryptoRng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::{
    group::{self, Gt},
    hierarchy::{NodeKey, PublicParams},
};

/// RNG whose fallible interface always errors.
pub struct FailingRng;

impl RngCore for FailingRng {
    fn next_u32(&mut self) -> u32 {
        0
    }

    fn next_u64(&mut self) -> u64 {
        0
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        dest.fill(0);
    }

    fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
        Err(rand::Error::new(std::io::Error::other("entropy source unavailable")))
    }
}

impl CryptoRng for FailingRng {}

/// Fresh root key of the given depth, with its pairing base and the RNG
/// that produced it.
pub fn root_key(depth: u8, seed: u64) -> (NodeKey, Gt, ChaCha20Rng) {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let params = PublicParams::get();
    let alpha = group::random_scalar(&mut rng).unwrap();
    let master = (params.g() * alpha).into_affine();
    let gt_base = group::pairing(params.g2(), master);
    let root = NodeKey::root(&alpha, depth, &mut rng).unwrap();
    (root, gt_base, rng)
}
