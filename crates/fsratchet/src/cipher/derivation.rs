//! Session key derivation using HKDF

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::group::{self, Gt};

/// Label used for session key derivation
const SESSION_KEY_LABEL: &[u8] = b"fsratchet-session-v1";

/// Symmetric key for one ciphertext.
///
/// Used for a single encryption or decryption and dropped right after.
pub struct SessionKey {
    key: [u8; 32],
}

impl SessionKey {
    /// 32-byte key for `XChaCha20-Poly1305`.
    pub fn key(&self) -> &[u8; 32] {
        &self.key
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// Derive the session key from an encapsulated shared secret.
///
/// HKDF-SHA256 with the encoded encapsulation as salt, the shared GT element
/// as input key material, and `label || epoch` as info.
///
/// # Security
///
/// - Different encapsulations produce independent keys, even for equal
///   shared secrets
/// - The epoch is bound into the key, so a ciphertext retagged with another
///   epoch derives a different key
pub fn derive_session_key(shared: &Gt, encapsulation: &[u8], epoch: u64) -> SessionKey {
    let ikm = group::gt_bytes(shared);
    let hkdf = Hkdf::<Sha256>::new(Some(encapsulation), &ikm);

    let mut info = Vec::with_capacity(SESSION_KEY_LABEL.len() + 8);
    info.extend_from_slice(SESSION_KEY_LABEL);
    info.extend_from_slice(&epoch.to_be_bytes());

    let mut key = [0u8; 32];
    let Ok(()) = hkdf.expand(&info, &mut key) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };

    SessionKey { key }
}
