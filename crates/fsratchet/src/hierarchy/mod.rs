//! Key hierarchy over the epoch tree.
//!
//! Every tree node has a secret key that can derive the keys of its
//! children but not of its parent or siblings. A private key holds a
//! [`KeyStack`] of node keys covering exactly the current and future
//! epochs; advancing replaces the stack and zeroizes what was dropped.
//!
//! ```text
//! alpha (discarded after key generation)
//!        │
//!        ▼
//! root NodeKey ── derive_child ──► NodeKey per tree node
//!                                        │
//!                                        ▼
//!                        KeyStack (current node + right siblings)
//! ```

mod node_key;
mod params;
mod stack;

pub use node_key::NodeKey;
pub use params::PublicParams;
pub use stack::KeyStack;
