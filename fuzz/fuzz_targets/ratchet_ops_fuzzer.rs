//! Fuzz target for ratchet operation sequences
//!
//! Drives a small key pair through arbitrary ratchets, jumps, encryptions,
//! and serialization round trips.
//!
//! # Invariants
//!
//! - The private key never moves backwards and never past the last epoch
//! - A failed ratchet leaves the epoch unchanged
//! - Ciphertexts for the current epoch decrypt, all others are rejected
//! - The private key always matches the public key at its epoch

#![no_main]

use arbitrary::Arbitrary;
use fsratchet::{Ciphertext, PrivateKey, RatchetConfig, RatchetError, generate_keypair};
use libfuzzer_sys::fuzz_target;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

#[derive(Debug, Arbitrary)]
struct Scenario {
    seed: u64,
    /// Tree depth, clamped to 1..=4
    depth: u8,
    operations: Vec<Operation>,
}

#[derive(Debug, Arbitrary)]
enum Operation {
    /// Ratchet one step
    Ratchet,
    /// Ratchet to an arbitrary epoch (may be in the past or out of range)
    RatchetTo { target: u8 },
    /// Encrypt a message to an arbitrary epoch
    Encrypt { epoch: u8, message: Vec<u8> },
    /// Decrypt every stored ciphertext
    DecryptAll,
    /// Replace the private key by its decoded encoding
    Reload,
}

fuzz_target!(|scenario: Scenario| {
    let depth = scenario.depth % 4 + 1;
    let config = RatchetConfig::new(depth).unwrap();
    let last = config.last_epoch();

    let mut rng = ChaCha20Rng::seed_from_u64(scenario.seed);
    let (pk, mut sk) = generate_keypair(config, &mut rng).unwrap();
    let mut sent: Vec<(Ciphertext, Vec<u8>)> = Vec::new();

    for operation in scenario.operations.into_iter().take(32) {
        let before = sk.epoch();
        match operation {
            Operation::Ratchet => match sk.ratchet(&mut rng) {
                Ok(()) => assert_eq!(sk.epoch(), before + 1),
                Err(RatchetError::RatchetExhausted { .. }) => {
                    assert_eq!(before, last);
                    assert_eq!(sk.epoch(), before);
                },
                Err(other) => panic!("unexpected ratchet error: {other:?}"),
            },
            Operation::RatchetTo { target } => {
                let target = u64::from(target);
                match sk.ratchet_to(target, &mut rng) {
                    Ok(()) => assert_eq!(sk.epoch(), target),
                    Err(RatchetError::EpochRegression { .. }) => assert!(target < before),
                    Err(RatchetError::RatchetExhausted { .. }) => assert!(target > last),
                    Err(other) => panic!("unexpected ratchet error: {other:?}"),
                }
                if sk.epoch() != target {
                    assert_eq!(sk.epoch(), before);
                }
            },
            Operation::Encrypt { epoch, message } => {
                if let Ok(target) = pk.at_epoch(u64::from(epoch)) {
                    let ciphertext = target.encrypt(&message, &mut rng).unwrap();
                    sent.push((ciphertext, message));
                }
            },
            Operation::DecryptAll => {
                for (ciphertext, message) in &sent {
                    match sk.decrypt(ciphertext) {
                        Ok(plaintext) => {
                            assert_eq!(ciphertext.epoch, sk.epoch());
                            assert_eq!(&plaintext, message);
                        },
                        Err(RatchetError::EpochMismatch { .. }) => {
                            assert_ne!(ciphertext.epoch, sk.epoch());
                        },
                        Err(other) => panic!("unexpected decrypt error: {other:?}"),
                    }
                }
            },
            Operation::Reload => {
                sk = PrivateKey::from_bytes(&sk.to_bytes()).unwrap();
                assert_eq!(sk.epoch(), before);
            },
        }

        assert!(sk.matches(&pk.at_epoch(sk.epoch()).unwrap()));
    }
});
