//! Fuzz target for PublicKey::from_bytes
//!
//! The decoder should NEVER panic. Every accepted input must re-encode to
//! the exact same bytes.

#![no_main]

use fsratchet::PublicKey;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(key) = PublicKey::from_bytes(data) {
        assert_eq!(key.to_bytes(), data, "public key encoding must be canonical");
    }
});
