//! Fuzz target for Ciphertext::from_bytes
//!
//! Arbitrary bytes are decoded as a ciphertext and, when structurally valid,
//! handed to a real private key. Decryption must reject every input with an
//! error and never panic: a fuzzer cannot forge a valid tag.

#![no_main]

use std::sync::OnceLock;

use fsratchet::{Ciphertext, PrivateKey, RatchetConfig, RatchetError, generate_keypair};
use libfuzzer_sys::fuzz_target;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

fn private_key() -> &'static PrivateKey {
    static KEY: OnceLock<PrivateKey> = OnceLock::new();
    KEY.get_or_init(|| {
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let config = RatchetConfig::new(4).unwrap();
        generate_keypair(config, &mut rng).unwrap().1
    })
}

fuzz_target!(|data: &[u8]| {
    let Ok(ciphertext) = Ciphertext::from_bytes(data) else {
        return;
    };

    assert_eq!(ciphertext.to_bytes(), data, "ciphertext encoding must be canonical");

    match private_key().decrypt(&ciphertext) {
        Err(RatchetError::EpochMismatch { .. } | RatchetError::AuthenticationFailure) => {},
        other => panic!("unexpected decryption result: {other:?}"),
    }
});
