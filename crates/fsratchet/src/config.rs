//! Ratchet configuration.

use crate::error::{RatchetError, Result};

/// Maximum supported depth of the key tree.
pub const MAX_DEPTH: u8 = 32;

/// Depth used by [`RatchetConfig::default`].
pub const DEFAULT_DEPTH: u8 = 32;

/// Configuration for a key pair.
///
/// The key tree is a complete binary tree of `depth` levels below the root.
/// Every node is one epoch, so a tree of depth `d` supports `2^(d+1) - 1`
/// epochs. Ratcheting past the last epoch fails with
/// [`RatchetError::RatchetExhausted`].
///
/// Each tree level adds one group element to the root key and to the public
/// parameters, so smaller depths give smaller keys and faster ratchets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatchetConfig {
    depth: u8,
}

impl RatchetConfig {
    /// Create a configuration with the given tree depth.
    ///
    /// # Errors
    ///
    /// - `InvalidConfiguration` if `depth` is 0 or exceeds [`MAX_DEPTH`]
    pub fn new(depth: u8) -> Result<Self> {
        if depth == 0 || depth > MAX_DEPTH {
            return Err(RatchetError::InvalidConfiguration {
                reason: format!("depth must be in 1..={MAX_DEPTH}, got {depth}"),
            });
        }
        Ok(Self { depth })
    }

    /// Depth of the key tree.
    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Number of epochs the key pair supports.
    pub fn epoch_count(&self) -> u64 {
        (1u64 << (u32::from(self.depth) + 1)) - 1
    }

    /// Last epoch the key pair can reach.
    pub fn last_epoch(&self) -> u64 {
        self.epoch_count() - 1
    }
}

impl Default for RatchetConfig {
    fn default() -> Self {
        Self { depth: DEFAULT_DEPTH }
    }
}
