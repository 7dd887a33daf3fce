//! Forward-secure ratcheting public-key encryption
//!
//! A key pair whose public and private halves both advance through a
//! sequence of epochs. Anyone holding the public key encrypts to its current
//! epoch; only the private key at that epoch decrypts. Advancing the private
//! key destroys the ability to decrypt every earlier epoch, even for an
//! attacker who later steals the current key.
//!
//! Randomness is always supplied by the caller, so tests can use a seeded
//! RNG and production code passes a CSPRNG such as `rand::rngs::OsRng`.
//!
//! # Key Lifecycle
//!
//! Epochs are the nodes of a binary tree, numbered in preorder. Every node
//! has a secret key from which the keys of its children can be derived, but
//! not the other way round. The private key holds the current node's key
//! plus the keys of the right siblings along its path, which is exactly
//! enough to reach every future epoch.
//!
//! ```text
//! generate_keypair
//!        │
//!        ▼
//! PublicKey (epoch e) ── encrypt ──► Ciphertext (epoch e)
//!        │                                 │
//!     ratchet                              ▼
//!        │                 PrivateKey (epoch e) ── decrypt ──► plaintext
//!        ▼                                 │
//! PublicKey (epoch e+1)                 ratchet (node keys for e zeroized)
//!                                          ▼
//!                                PrivateKey (epoch e+1)
//! ```
//!
//! # Security
//!
//! Forward Secrecy:
//! - Ratcheting drops and zeroizes every node key for a past epoch
//! - Child keys are re-randomized, so they reveal nothing about the parent
//! - `PrivateKey` is not `Clone` and is zeroized on drop
//!
//! Epoch Binding:
//! - Ciphertexts are encapsulated to the epoch's identity element
//! - The epoch is mixed into the session key and authenticated as AEAD data
//! - A ciphertext for another epoch is rejected before any pairing work
//!
//! Authenticity:
//! - XChaCha20-Poly1305 covers epoch, encapsulation, and payload
//! - Decoded private keys are checked against their master element with
//!   pairing equations
//!
//! # Example
//!
//! ```
//! use fsratchet::{RatchetConfig, generate_keypair};
//! use rand::SeedableRng;
//!
//! let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(7);
//! let config = RatchetConfig::new(4)?;
//! let (mut public_key, mut private_key) = generate_keypair(config, &mut rng)?;
//!
//! public_key.ratchet()?;
//! private_key.ratchet(&mut rng)?;
//!
//! let ciphertext = public_key.encrypt(b"hello", &mut rng)?;
//! assert_eq!(private_key.decrypt(&ciphertext)?, b"hello");
//! # Ok::<(), fsratchet::RatchetError>(())
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cipher;
pub mod codec;
pub mod config;
pub mod error;
pub mod group;
pub mod hierarchy;
pub mod keys;
pub mod tree;

#[cfg(test)]
mod testing;

pub use cipher::Ciphertext;
pub use config::{DEFAULT_DEPTH, MAX_DEPTH, RatchetConfig};
pub use error::{RatchetError, Result};
pub use keys::{PrivateKey, PublicKey, generate_keypair};
