//! Payload encryption using `XChaCha20-Poly1305`
//!
//! All functions are pure - the nonce must be provided by the caller.

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit, Payload},
};

use super::{derivation::SessionKey, kem::ENCAPSULATION_BYTES};
use crate::error::{RatchetError, Result};

/// Size of the `XChaCha20` nonce (24 bytes)
pub const NONCE_SIZE: usize = 24;

/// Poly1305 tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

/// A ciphertext for one epoch of a key pair.
///
/// The encapsulation is kept as raw bytes. It is only decoded during
/// decryption, where it is also covered by the authentication tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ciphertext {
    /// Epoch the ciphertext was encrypted for
    pub epoch: u64,
    /// Encoded key encapsulation
    pub encapsulation: [u8; ENCAPSULATION_BYTES],
    /// The 24-byte `XChaCha20` nonce
    pub nonce: [u8; NONCE_SIZE],
    /// Encrypted payload including the 16-byte Poly1305 tag
    pub payload: Vec<u8>,
}

impl Ciphertext {
    /// Encode as `epoch || encapsulation || nonce || payload`.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        crate::codec::encode_ciphertext(self)
    }

    /// Decode a ciphertext.
    ///
    /// # Errors
    ///
    /// - `MalformedCiphertext` if `bytes` is too short to hold the fixed
    ///   fields and a tag
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        crate::codec::decode_ciphertext(bytes)
    }
}

/// Encrypt `plaintext` under `session_key`.
///
/// # Security
///
/// - The epoch and encapsulation are authenticated as associated data
/// - Each session key is fresh, so a random nonce never repeats under a key
pub fn seal(
    session_key: &SessionKey,
    epoch: u64,
    encapsulation: [u8; ENCAPSULATION_BYTES],
    nonce: [u8; NONCE_SIZE],
    plaintext: &[u8],
) -> Ciphertext {
    let cipher = XChaCha20Poly1305::new(session_key.key().into());
    let aad = associated_data(epoch, &encapsulation);

    let Ok(payload) =
        cipher.encrypt(XNonce::from_slice(&nonce), Payload { msg: plaintext, aad: &aad })
    else {
        unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
    };

    Ciphertext { epoch, encapsulation, nonce, payload }
}

/// Decrypt a ciphertext with its session key.
///
/// # Errors
///
/// - `AuthenticationFailure` if the tag does not verify (wrong key or any
///   modification of epoch, encapsulation, nonce, or payload)
pub fn open(session_key: &SessionKey, ciphertext: &Ciphertext) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(session_key.key().into());
    let aad = associated_data(ciphertext.epoch, &ciphertext.encapsulation);

    cipher
        .decrypt(
            XNonce::from_slice(&ciphertext.nonce),
            Payload { msg: &ciphertext.payload, aad: &aad },
        )
        .map_err(|_| RatchetError::AuthenticationFailure)
}

/// Associated data: `epoch (8, big-endian) || encapsulation`.
fn associated_data(epoch: u64, encapsulation: &[u8; ENCAPSULATION_BYTES]) -> Vec<u8> {
    let mut aad = Vec::with_capacity(8 + ENCAPSULATION_BYTES);
    aad.extend_from_slice(&epoch.to_be_bytes());
    aad.extend_from_slice(encapsulation);
    aad
}
