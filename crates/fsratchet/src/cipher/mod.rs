//! Hybrid encryption to an epoch.
//!
//! ```text
//! e(g2, g1)^s ──► Encapsulation (s*g, s*H(w))
//!      │
//!      ▼
//! HKDF(salt = encapsulation, info = label || epoch) → Session Key
//!      │
//!      ▼
//! XChaCha20-Poly1305 (aad = epoch || encapsulation) → Ciphertext
//! ```

mod derivation;
mod encryption;
mod kem;

use ark_bls12_381::G1Affine;
use rand::{CryptoRng, RngCore};

pub use derivation::{SessionKey, derive_session_key};
pub use encryption::{Ciphertext, NONCE_SIZE, TAG_SIZE, open, seal};
pub use kem::{ENCAPSULATION_BYTES, Encapsulation};

use crate::{
    error::{RatchetError, Result},
    group::Gt,
    hierarchy::NodeKey,
};

/// Encrypt `plaintext` to the node with identity element `identity`.
///
/// # Errors
///
/// - `RngFailure` if the RNG fails while sampling the encapsulation or nonce
pub(crate) fn encrypt<R: RngCore + CryptoRng>(
    epoch: u64,
    gt_base: &Gt,
    identity: G1Affine,
    plaintext: &[u8],
    rng: &mut R,
) -> Result<Ciphertext> {
    let (encapsulation, shared) = Encapsulation::encapsulate(gt_base, identity, rng)?;
    let encapsulation = encapsulation.to_bytes();
    let session_key = derive_session_key(&shared, &encapsulation, epoch);

    let mut nonce = [0u8; NONCE_SIZE];
    rng.try_fill_bytes(&mut nonce)
        .map_err(|e| RatchetError::RngFailure { reason: e.to_string() })?;

    Ok(seal(&session_key, epoch, encapsulation, nonce, plaintext))
}

/// Decrypt a ciphertext with the node key of epoch `epoch`.
///
/// # Errors
///
/// - `EpochMismatch` if the ciphertext is tagged with another epoch
/// - `AuthenticationFailure` if the encapsulation does not decode or the tag
///   does not verify
pub(crate) fn decrypt(key: &NodeKey, epoch: u64, ciphertext: &Ciphertext) -> Result<Vec<u8>> {
    if ciphertext.epoch != epoch {
        return Err(RatchetError::EpochMismatch { expected: epoch, actual: ciphertext.epoch });
    }

    // The encapsulation is authenticated, so malformed bytes are a forgery.
    let encapsulation = Encapsulation::from_bytes(&ciphertext.encapsulation)
        .map_err(|_| RatchetError::AuthenticationFailure)?;

    let shared = encapsulation.decapsulate(key);
    let session_key = derive_session_key(&shared, &ciphertext.encapsulation, epoch);
    open(&session_key, ciphertext)
}
