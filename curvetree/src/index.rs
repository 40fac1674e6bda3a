//! Node addressing and the stored node record.

use curvetree_pedersen::{CompressedEdwardsY, EdwardsPoint};

use crate::config::INTERNAL_BRANCH_WIDTH;
use crate::error::CurveTreeError;

/// Serialized size of a [`TreeNode`]: compressed hash plus child count.
pub const TREE_NODE_SIZE: usize = 40;

/// Coordinate of a node: layer 0 holds leaf commitments, higher layers hold
/// internal nodes. The root lives at `(depth - 1, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TreeIndex {
    pub layer: u32,
    pub index: u64,
}

impl TreeIndex {
    pub fn new(layer: u32, index: u64) -> Self {
        Self { layer, index }
    }

    /// The index of this node's parent one layer up.
    pub fn parent(&self) -> TreeIndex {
        TreeIndex::new(self.layer + 1, self.index / INTERNAL_BRANCH_WIDTH)
    }

    /// This node's slot within its parent.
    pub fn child_slot(&self) -> u64 {
        self.index % INTERNAL_BRANCH_WIDTH
    }
}

/// A stored tree node: its hash and how many children were folded into it.
///
/// `child_count` distinguishes full nodes from partially-filled frontier
/// nodes so later path updates know how much of the node to recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeNode {
    pub hash: EdwardsPoint,
    pub child_count: u64,
}

impl TreeNode {
    pub fn new(hash: EdwardsPoint, child_count: u64) -> Self {
        Self { hash, child_count }
    }

    /// 40-byte record: 32-byte compressed hash, 8-byte LE child count.
    pub fn to_bytes(&self) -> [u8; TREE_NODE_SIZE] {
        let mut bytes = [0u8; TREE_NODE_SIZE];
        bytes[..32].copy_from_slice(self.hash.compress().as_bytes());
        bytes[32..].copy_from_slice(&self.child_count.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CurveTreeError> {
        if bytes.len() != TREE_NODE_SIZE {
            return Err(CurveTreeError::CorruptedData(format!(
                "tree node record is {} bytes, expected {TREE_NODE_SIZE}",
                bytes.len()
            )));
        }
        let mut hash_bytes = [0u8; 32];
        hash_bytes.copy_from_slice(&bytes[..32]);
        let hash = CompressedEdwardsY(hash_bytes).decompress().ok_or_else(|| {
            CurveTreeError::CorruptedData(format!(
                "stored node hash {} is not a curve point",
                hex::encode(hash_bytes)
            ))
        })?;
        let mut count_bytes = [0u8; 8];
        count_bytes.copy_from_slice(&bytes[32..]);
        Ok(Self {
            hash,
            child_count: u64::from_le_bytes(count_bytes),
        })
    }
}

#[cfg(test)]
mod tests {
    use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;

    use super::*;

    #[test]
    fn parent_and_slot() {
        let idx = TreeIndex::new(0, 77);
        assert_eq!(idx.parent(), TreeIndex::new(1, 77 / INTERNAL_BRANCH_WIDTH));
        assert_eq!(idx.child_slot(), 77 % INTERNAL_BRANCH_WIDTH);
    }

    #[test]
    fn node_round_trips() {
        let node = TreeNode::new(ED25519_BASEPOINT_POINT, 17);
        let decoded = TreeNode::from_bytes(&node.to_bytes()).expect("round trip");
        assert_eq!(decoded, node);
    }

    #[test]
    fn truncated_node_rejected() {
        let node = TreeNode::new(ED25519_BASEPOINT_POINT, 1);
        let bytes = node.to_bytes();
        assert!(matches!(
            TreeNode::from_bytes(&bytes[..39]),
            Err(CurveTreeError::CorruptedData(_))
        ));
    }
}
