//! Error types for ratchet key operations

use thiserror::Error;

/// Errors from key generation, ratcheting, encryption and decoding.
///
/// Every fallible operation in this crate reports through this type. A failed
/// ratchet leaves the key in its previous epoch, so callers can keep using it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RatchetError {
    /// Bytes do not encode a valid group element of the expected subgroup
    #[error("invalid key encoding: {element}")]
    InvalidKeyEncoding {
        /// Which element failed to decode
        element: &'static str,
    },

    /// Encoded key material is truncated or structurally malformed
    #[error("deserialization failed: {reason}")]
    Deserialization {
        /// Reason for the rejection
        reason: String,
    },

    /// Ciphertext epoch doesn't match the decrypting key's epoch
    #[error("epoch mismatch: key is at {expected}, ciphertext is for {actual}")]
    EpochMismatch {
        /// Epoch of the private key
        expected: u64,
        /// Epoch tag carried by the ciphertext
        actual: u64,
    },

    /// Integrity check failed (tampered or forged ciphertext)
    #[error("authentication failed")]
    AuthenticationFailure,

    /// Ciphertext length or field layout is inconsistent
    #[error("malformed ciphertext: {reason}")]
    MalformedCiphertext {
        /// Reason for the rejection
        reason: String,
    },

    /// The key tree has no epoch after the requested one
    #[error("ratchet exhausted at epoch {epoch} (last epoch is {last})")]
    RatchetExhausted {
        /// Epoch the key is currently at
        epoch: u64,
        /// Last epoch the tree supports
        last: u64,
    },

    /// Entropy source failed to produce random bytes
    #[error("random number generator failure: {reason}")]
    RngFailure {
        /// Error reported by the RNG
        reason: String,
    },

    /// Requested a ratchet target that lies in the past
    #[error("cannot ratchet backwards: at epoch {current}, requested {requested}")]
    EpochRegression {
        /// Epoch the key is currently at
        current: u64,
        /// Requested target epoch
        requested: u64,
    },

    /// Configuration values are out of range
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Reason for the rejection
        reason: String,
    },
}

impl RatchetError {
    /// Returns true if this error is fatal for the input that caused it.
    ///
    /// Fatal errors mean the input is corrupted or forged and retrying it can
    /// never succeed. Non-fatal errors describe the key's state (wrong epoch,
    /// exhausted tree) or the environment (RNG) and may clear up.
    pub fn is_fatal(&self) -> bool {
        match self {
            // Corrupted or forged input
            Self::InvalidKeyEncoding { .. } => true,
            Self::Deserialization { .. } => true,
            Self::AuthenticationFailure => true,
            Self::MalformedCiphertext { .. } => true,
            Self::InvalidConfiguration { .. } => true,

            // Key state or environment
            Self::EpochMismatch { .. } => false,
            Self::RatchetExhausted { .. } => false,
            Self::RngFailure { .. } => false,
            Self::EpochRegression { .. } => false,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RatchetError>;
