//! Private key stack for forward-secure epoch transitions.
//!
//! # Security Properties
//!
//! - Forward Secrecy: node keys for past epochs are dropped (and zeroized)
//!   when advancing, and nothing left on the stack derives them
//! - Completeness: every future epoch lies in the subtree of exactly one
//!   stack entry
//! - Atomicity: a failed transition leaves the stack untouched

use rand::{CryptoRng, RngCore};

use super::node_key::NodeKey;
use crate::{
    error::{RatchetError, Result},
    tree::{NodeName, Tree},
};

/// Node keys held by a private key, bottom to top.
///
/// The top entry is the key of the current epoch's node. Beneath it are the
/// keys of the right siblings along the path to that node, shallowest at the
/// bottom. This is exactly [`Tree::stack_layout`] of the current node.
///
/// # Security
///
/// - Each [`advance_to`](Self::advance_to) derives the new path into a
///   separate list and only then replaces the stack
/// - Replaced entries are zeroized on drop
pub struct KeyStack {
    tree: Tree,
    epoch: u64,
    keys: Vec<NodeKey>,
}

impl KeyStack {
    /// Stack at epoch 0, holding only the root key.
    pub(crate) fn new(tree: Tree, root: NodeKey) -> Self {
        debug_assert!(root.node().is_root());
        Self { tree, epoch: 0, keys: vec![root] }
    }

    /// Rebuild a stack from decoded keys.
    ///
    /// The caller has checked that the key nodes match
    /// `tree.stack_layout(tree.node_at(epoch))`.
    pub(crate) fn from_parts(tree: Tree, epoch: u64, keys: Vec<NodeKey>) -> Self {
        debug_assert!(!keys.is_empty());
        debug_assert_eq!(
            tree.node_at(epoch).map(|node| tree.stack_layout(node)),
            Some(keys.iter().map(NodeKey::node).collect::<Vec<_>>())
        );
        Self { tree, epoch, keys }
    }

    /// Current epoch.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Tree the stack lives in.
    pub fn tree(&self) -> Tree {
        self.tree
    }

    /// Key of the current epoch's node.
    pub fn current(&self) -> &NodeKey {
        let Some(top) = self.keys.last() else {
            unreachable!("key stack is never empty");
        };
        top
    }

    /// All held keys, bottom to top.
    pub fn entries(&self) -> &[NodeKey] {
        &self.keys
    }

    /// True if some held key can derive the key for `epoch`.
    #[cfg(test)]
    pub(crate) fn covers(&self, epoch: u64) -> bool {
        self.tree
            .node_at(epoch)
            .is_some_and(|node| self.keys.iter().any(|key| key.node().contains(node)))
    }

    /// Move to `target`, dropping every key for an earlier epoch.
    ///
    /// Returns the number of child keys derived.
    ///
    /// # Errors
    ///
    /// - `EpochRegression` if `target` is before the current epoch
    /// - `RatchetExhausted` if `target` is beyond the last epoch
    /// - `RngFailure` if randomizing a derived key fails
    ///
    /// On error the stack is unchanged.
    pub(crate) fn advance_to<R: RngCore + CryptoRng>(
        &mut self,
        target: u64,
        rng: &mut R,
    ) -> Result<usize> {
        if target < self.epoch {
            return Err(RatchetError::EpochRegression { current: self.epoch, requested: target });
        }
        if target == self.epoch {
            return Ok(0);
        }

        let Some(target_node) = self.tree.node_at(target) else {
            return Err(RatchetError::RatchetExhausted {
                epoch: self.epoch,
                last: self.tree.last_epoch(),
            });
        };

        let Some(index) = self.keys.iter().rposition(|key| key.node().contains(target_node))
        else {
            unreachable!("key stack covers every future epoch");
        };

        let (fresh, leaf) = descend(&self.keys[index], target_node, rng)?;
        let derived = fresh.len() + usize::from(leaf.is_some());

        // Everything from `index` upwards covers only epochs before `target`,
        // except the start entry itself when it is the target node.
        match leaf {
            Some(leaf) => {
                self.keys.truncate(index);
                self.keys.extend(fresh);
                self.keys.push(leaf);
            },
            None => self.keys.truncate(index + 1),
        }
        self.epoch = target;

        debug_assert_eq!(self.current().node(), target_node);
        Ok(derived)
    }
}

impl std::fmt::Debug for KeyStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStack")
            .field("epoch", &self.epoch)
            .field("depth", &self.tree.depth())
            .field("entries", &self.keys.len())
            .finish()
    }
}

/// Derive the path from `start` down to `target`.
///
/// Returns the right siblings of every left step, shallowest first, and the
/// key for `target` (`None` when `start` already is `target`).
fn descend<R: RngCore + CryptoRng>(
    start: &NodeKey,
    target: NodeName,
    rng: &mut R,
) -> Result<(Vec<NodeKey>, Option<NodeKey>)> {
    let mut siblings = Vec::new();
    let mut cursor: Option<NodeKey> = None;

    for level in start.node().level() + 1..=target.level() {
        let parent = cursor.as_ref().unwrap_or(start);
        let bit = target.bit(level);
        if bit == 0 {
            siblings.push(parent.derive_child(1, rng)?);
        }
        cursor = Some(parent.derive_child(bit, rng)?);
    }

    Ok((siblings, cursor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::RatchetConfig,
        testing::{FailingRng, root_key},
    };

    fn stack(depth: u8, seed: u64) -> (KeyStack, crate::group::Gt, rand_chacha::ChaCha20Rng) {
        let (root, gt_base, rng) = root_key(depth, seed);
        let tree = Tree::new(RatchetConfig::new(depth).unwrap());
        (KeyStack::new(tree, root), gt_base, rng)
    }

    fn layout(stack: &KeyStack) -> Vec<NodeName> {
        stack.entries().iter().map(NodeKey::node).collect()
    }

    #[test]
    fn new_stack_holds_root() {
        let (stack, _, _) = stack(3, 1);
        assert_eq!(stack.epoch(), 0);
        assert_eq!(layout(&stack), vec![NodeName::ROOT]);
    }

    #[test]
    fn sequential_advance_follows_layout() {
        let (mut stack, gt_base, mut rng) = stack(3, 2);
        let tree = stack.tree();

        for epoch in 1..=tree.last_epoch() {
            stack.advance_to(epoch, &mut rng).unwrap();
            assert_eq!(stack.epoch(), epoch);

            let node = tree.node_at(epoch).unwrap();
            assert_eq!(layout(&stack), tree.stack_layout(node));
            assert!(stack.current().verify(&gt_base, &epoch.to_be_bytes()));
        }
    }

    #[test]
    fn advance_drops_past_epochs() {
        let (mut stack, _, mut rng) = stack(3, 3);
        let last = stack.tree().last_epoch();

        for epoch in 1..=last {
            stack.advance_to(epoch, &mut rng).unwrap();
            for past in 0..epoch {
                assert!(!stack.covers(past), "epoch {past} still covered at {epoch}");
            }
            for future in epoch..=last {
                assert!(stack.covers(future), "epoch {future} lost at {epoch}");
            }
        }
    }

    #[test]
    fn jump_matches_sequential_layout() {
        let (mut stack, gt_base, mut rng) = stack(4, 4);
        let tree = stack.tree();

        for target in [3, 9, 10, 17, 30] {
            stack.advance_to(target, &mut rng).unwrap();
            assert_eq!(layout(&stack), tree.stack_layout(tree.node_at(target).unwrap()));
            for key in stack.entries() {
                assert!(key.verify(&gt_base, &target.to_be_bytes()));
            }
        }
    }

    #[test]
    fn advance_to_pending_sibling_needs_no_derivation() {
        let (mut stack, _, mut rng) = stack(2, 5);
        stack.advance_to(3, &mut rng).unwrap();

        // Epoch 4 is the root's right child, already on the stack.
        let derived = stack.advance_to(4, &mut rng).unwrap();
        assert_eq!(derived, 0);
        assert_eq!(layout(&stack), vec![NodeName::ROOT.right()]);
    }

    #[test]
    fn advance_to_same_epoch_is_noop() {
        let (mut stack, _, mut rng) = stack(3, 6);
        stack.advance_to(2, &mut rng).unwrap();
        let before = layout(&stack);

        assert_eq!(stack.advance_to(2, &mut rng).unwrap(), 0);
        assert_eq!(layout(&stack), before);
    }

    #[test]
    fn regression_rejected() {
        let (mut stack, _, mut rng) = stack(3, 7);
        stack.advance_to(5, &mut rng).unwrap();

        assert_eq!(
            stack.advance_to(4, &mut rng).unwrap_err(),
            RatchetError::EpochRegression { current: 5, requested: 4 }
        );
        assert_eq!(stack.epoch(), 5);
    }

    #[test]
    fn exhaustion_leaves_state_intact() {
        let (mut stack, _, mut rng) = stack(2, 8);
        stack.advance_to(6, &mut rng).unwrap();
        let before = layout(&stack);

        assert_eq!(
            stack.advance_to(7, &mut rng).unwrap_err(),
            RatchetError::RatchetExhausted { epoch: 6, last: 6 }
        );
        assert_eq!(stack.epoch(), 6);
        assert_eq!(layout(&stack), before);
    }

    #[test]
    fn rng_failure_leaves_state_intact() {
        let (mut stack, gt_base, mut rng) = stack(3, 9);
        stack.advance_to(1, &mut rng).unwrap();
        let before = layout(&stack);

        let result = stack.advance_to(5, &mut FailingRng);
        assert!(matches!(result, Err(RatchetError::RngFailure { .. })));
        assert_eq!(stack.epoch(), 1);
        assert_eq!(layout(&stack), before);
        assert!(stack.current().verify(&gt_base, b"after failure"));
    }
}
