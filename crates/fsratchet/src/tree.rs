//! Positions in the binary key tree.
//!
//! Every node of a complete binary tree of depth `D` is one epoch. Epochs are
//! numbered in preorder: the root is epoch 0, a left child is its parent's
//! epoch plus one, and a right child comes after the whole left subtree.
//!
//! ```text
//!   depth 2:          0
//!                   /   \
//!                  1     4
//!                 / \   / \
//!                2   3 5   6
//! ```
//!
//! A node is named by its path from the root. Bit `1` is a step to the right
//! child; the most recent step is the least significant bit of `path`.

use crate::config::RatchetConfig;

/// Name of a node: its depth below the root and the path bits leading to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeName {
    len: u8,
    path: u32,
}

impl NodeName {
    /// The root of the tree (epoch 0).
    pub const ROOT: Self = Self { len: 0, path: 0 };

    /// Number of steps from the root.
    pub fn level(self) -> u8 {
        self.len
    }

    /// True for the root node.
    pub fn is_root(self) -> bool {
        self.len == 0
    }

    /// Child in direction `bit` (0 = left, 1 = right).
    pub fn child(self, bit: u8) -> Self {
        debug_assert!(bit <= 1);
        debug_assert!(self.len < crate::config::MAX_DEPTH);
        Self { len: self.len + 1, path: (self.path << 1) | u32::from(bit) }
    }

    /// Left child.
    pub fn left(self) -> Self {
        self.child(0)
    }

    /// Right child.
    pub fn right(self) -> Self {
        self.child(1)
    }

    /// Parent node, `None` for the root.
    pub fn parent(self) -> Option<Self> {
        if self.is_root() {
            None
        } else {
            Some(Self { len: self.len - 1, path: self.path >> 1 })
        }
    }

    /// Direction bit taken at `level` (1-based, `level <= len`).
    pub fn bit(self, level: u8) -> u8 {
        debug_assert!(level >= 1 && level <= self.len);
        ((self.path >> (self.len - level)) & 1) as u8
    }

    /// Ancestor of this node at `level` (the node itself when `level == len`).
    pub fn prefix(self, level: u8) -> Self {
        debug_assert!(level <= self.len);
        let path = (u64::from(self.path) >> (self.len - level)) as u32;
        Self { len: level, path }
    }

    /// Direction bits from the root down to this node.
    pub fn bits(self) -> impl Iterator<Item = u8> {
        (1..=self.len).map(move |level| self.bit(level))
    }

    /// True if `other` is this node or lies in its subtree.
    pub fn contains(self, other: Self) -> bool {
        other.len >= self.len
            && (u64::from(other.path) >> (other.len - self.len)) == u64::from(self.path)
    }
}

/// Epoch arithmetic for a tree of fixed depth.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tree {
    depth: u8,
}

impl Tree {
    /// Tree shaped by `config`.
    pub fn new(config: RatchetConfig) -> Self {
        Self { depth: config.depth() }
    }

    /// Depth of the tree.
    pub fn depth(self) -> u8 {
        self.depth
    }

    /// Last epoch of the tree.
    pub fn last_epoch(self) -> u64 {
        (1u64 << (u32::from(self.depth) + 1)) - 2
    }

    /// True if `node` has no children.
    pub fn is_leaf(self, node: NodeName) -> bool {
        node.level() == self.depth
    }

    /// Epoch offset of the right child of a node at `level`.
    ///
    /// Equals one plus the size of the left subtree.
    fn right_offset(self, level: u8) -> u64 {
        1u64 << (self.depth - level)
    }

    /// Preorder epoch number of `node`.
    pub fn epoch_of(self, node: NodeName) -> u64 {
        debug_assert!(node.level() <= self.depth);
        (0..node.level()).fold(0u64, |epoch, level| {
            if node.bit(level + 1) == 0 {
                epoch + 1
            } else {
                epoch + self.right_offset(level)
            }
        })
    }

    /// Node for `epoch`, `None` if the epoch is beyond the tree.
    pub fn node_at(self, epoch: u64) -> Option<NodeName> {
        if epoch > self.last_epoch() {
            return None;
        }

        let mut remaining = epoch;
        let mut node = NodeName::ROOT;
        while remaining > 0 {
            let offset = self.right_offset(node.level());
            if remaining >= offset {
                node = node.right();
                remaining -= offset;
            } else {
                node = node.left();
                remaining -= 1;
            }
        }

        debug_assert_eq!(self.epoch_of(node), epoch);
        Some(node)
    }

    /// Node of the following epoch, `None` after the last epoch.
    pub fn next(self, node: NodeName) -> Option<NodeName> {
        if !self.is_leaf(node) {
            return Some(node.left());
        }

        let mut current = node;
        while let Some(parent) = current.parent() {
            if current == parent.left() {
                return Some(parent.right());
            }
            current = parent;
        }
        None
    }

    /// Nodes whose keys a private key holds at `node`, bottom to top.
    ///
    /// The top entry is `node` itself. Below it are the right siblings of
    /// every left step on the path, deepest last. Together they cover exactly
    /// the epochs from `node` onwards.
    pub fn stack_layout(self, node: NodeName) -> Vec<NodeName> {
        let mut layout = Vec::with_capacity(usize::from(node.level()) + 1);
        for level in 1..=node.level() {
            if node.bit(level) == 0 {
                layout.push(node.prefix(level - 1).right());
            }
        }
        layout.push(node);
        layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(depth: u8) -> Tree {
        Tree::new(RatchetConfig::new(depth).unwrap())
    }

    #[test]
    fn children_extend_path() {
        assert_eq!(NodeName::ROOT.left(), NodeName { len: 1, path: 0 });
        assert_eq!(NodeName::ROOT.right(), NodeName { len: 1, path: 1 });
        assert_eq!(NodeName::ROOT.left().right().parent(), Some(NodeName::ROOT.left()));
        assert_eq!(NodeName::ROOT.parent(), None);
    }

    #[test]
    fn bits_walk_from_root() {
        let node = NodeName::ROOT.left().right().right();
        assert_eq!(node.bits().collect::<Vec<_>>(), vec![0, 1, 1]);
        assert_eq!(node.prefix(1), NodeName::ROOT.left());
        assert_eq!(node.prefix(0), NodeName::ROOT);
    }

    #[test]
    fn small_tree_preorder() {
        let tree = tree(2);
        let expected = [
            NodeName::ROOT,
            NodeName::ROOT.left(),
            NodeName::ROOT.left().left(),
            NodeName::ROOT.left().right(),
            NodeName::ROOT.right(),
            NodeName::ROOT.right().left(),
            NodeName::ROOT.right().right(),
        ];
        for (epoch, node) in expected.iter().enumerate() {
            assert_eq!(tree.node_at(epoch as u64), Some(*node));
            assert_eq!(tree.epoch_of(*node), epoch as u64);
        }
        assert_eq!(tree.node_at(7), None);
    }

    #[test]
    fn full_tree_numbering() {
        let tree = tree(32);
        assert_eq!(tree.epoch_of(NodeName::ROOT.right().left()), (1u64 << 32) + 1);
        assert_eq!(tree.node_at((1u64 << 32) + 1), Some(NodeName::ROOT.right().left()));
    }

    #[test]
    fn numbering_roundtrip() {
        let tree = tree(32);
        for epoch in [0u64, 1, 13, 42, 1337, 41_238, 9_182_736, 1_826_455, tree.last_epoch()] {
            let node = tree.node_at(epoch).unwrap();
            assert_eq!(tree.epoch_of(node), epoch);
        }
    }

    #[test]
    fn next_follows_numbering() {
        let tree = tree(3);
        let mut node = NodeName::ROOT;
        for epoch in 1..=tree.last_epoch() {
            node = tree.next(node).unwrap();
            assert_eq!(tree.epoch_of(node), epoch);
        }
        assert_eq!(tree.next(node), None);
    }

    #[test]
    fn next_from_leaf_climbs() {
        let tree = tree(32);
        let mut node = NodeName::ROOT;
        for _ in 0..32 {
            node = node.left();
        }
        assert!(tree.is_leaf(node));

        let mut expected = NodeName::ROOT;
        for _ in 0..31 {
            expected = expected.left();
        }
        assert_eq!(tree.next(node), Some(expected.right()));
    }

    #[test]
    fn contains_subtree() {
        let root = NodeName::ROOT;
        assert!(root.contains(root));
        assert!(root.contains(root.left().right()));
        assert!(root.left().contains(root.left().left()));
        assert!(!root.left().contains(root));
        assert!(!root.right().contains(root.left()));
        assert!(!root.left().contains(root.right()));
    }

    #[test]
    fn contains_handles_full_depth() {
        let tree = tree(32);
        let leaf = tree.node_at(tree.last_epoch()).unwrap();
        assert!(NodeName::ROOT.contains(leaf));
        assert!(NodeName::ROOT.right().contains(leaf));
        assert!(!NodeName::ROOT.left().contains(leaf));
    }

    #[test]
    fn stack_layout_covers_future_epochs() {
        let tree = tree(3);
        for epoch in 0..=tree.last_epoch() {
            let node = tree.node_at(epoch).unwrap();
            let layout = tree.stack_layout(node);
            assert_eq!(layout.last(), Some(&node));

            // Every future epoch is in exactly one covered subtree, no past one is.
            for other in 0..=tree.last_epoch() {
                let other_node = tree.node_at(other).unwrap();
                let covering = layout.iter().filter(|n| n.contains(other_node)).count();
                if other < epoch {
                    assert_eq!(covering, 0, "epoch {other} still covered at {epoch}");
                } else {
                    assert!(covering >= 1, "epoch {other} lost at {epoch}");
                }
            }
        }
    }

    #[test]
    fn stack_layout_ordered_by_epoch() {
        let tree = tree(4);
        let node = tree.node_at(3).unwrap();
        let epochs: Vec<u64> = tree.stack_layout(node).iter().map(|n| tree.epoch_of(*n)).collect();
        assert!(epochs.windows(2).all(|w| w[0] > w[1]), "{epochs:?}");
    }
}
