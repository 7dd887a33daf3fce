//! Fuzz target for PrivateKey::from_bytes
//!
//! # Strategy
//!
//! - Raw arbitrary bytes
//! - A valid encoded key with arbitrary byte flips, truncation, or extension
//!
//! # Invariants
//!
//! - Decoding never panics
//! - Every rejection is a `Deserialization` error
//! - Every accepted input re-encodes to the same bytes

#![no_main]

use std::sync::OnceLock;

use arbitrary::Arbitrary;
use fsratchet::{PrivateKey, RatchetConfig, RatchetError, generate_keypair};
use libfuzzer_sys::fuzz_target;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

#[derive(Debug, Arbitrary)]
enum Input {
    /// Bytes straight from the fuzzer
    Raw(Vec<u8>),
    /// Flip bits of a valid key
    Flip { flips: Vec<(u16, u8)> },
    /// Cut a valid key short
    Truncate { len: u16 },
    /// Append to a valid key
    Extend { extra: Vec<u8> },
}

/// Encoding of a depth-3 key at epoch 5
fn valid_key() -> &'static [u8] {
    static BYTES: OnceLock<Vec<u8>> = OnceLock::new();
    BYTES.get_or_init(|| {
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let config = RatchetConfig::new(3).unwrap();
        let (_, mut key) = generate_keypair(config, &mut rng).unwrap();
        key.ratchet_to(5, &mut rng).unwrap();
        key.to_bytes().to_vec()
    })
}

fuzz_target!(|input: Input| {
    let bytes = match input {
        Input::Raw(bytes) => bytes,
        Input::Flip { flips } => {
            let mut bytes = valid_key().to_vec();
            for (position, mask) in flips {
                let index = usize::from(position) % bytes.len();
                bytes[index] ^= mask;
            }
            bytes
        },
        Input::Truncate { len } => {
            let key = valid_key();
            key[..usize::from(len) % key.len()].to_vec()
        },
        Input::Extend { extra } => {
            let mut bytes = valid_key().to_vec();
            bytes.extend_from_slice(&extra);
            bytes
        },
    };

    match PrivateKey::from_bytes(&bytes) {
        Ok(key) => {
            assert_eq!(key.to_bytes().as_slice(), bytes.as_slice(), "encoding must be canonical");
        },
        Err(RatchetError::Deserialization { .. }) => {},
        Err(other) => panic!("unexpected error kind: {other:?}"),
    }
});
