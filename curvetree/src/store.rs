//! The storage contract the tree drives, plus the in-memory implementation.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::error::CurveTreeError;
use crate::index::{TreeIndex, TreeNode};
use crate::output::OutputTuple;

/// Persistence interface for tree nodes, outputs, and scalar metadata.
///
/// All writes issued between `begin_batch` and a successful `commit_batch`
/// must land atomically; after `abort_batch` none of them may be visible.
/// Batches nest: a rebuild triggered inside a batch insert joins the open
/// batch, and only the outermost commit applies writes. Reads issued while
/// a batch is open must observe its pending writes.
///
/// Implementations are driven single-writer (see [`CurveTree`] concurrency
/// notes); a durable implementation must still guard its own state so
/// concurrent readers never observe a half-committed batch.
///
/// [`CurveTree`]: crate::CurveTree
pub trait TreeStore {
    fn store_node(&self, index: TreeIndex, node: &TreeNode) -> Result<(), CurveTreeError>;
    fn get_node(&self, index: TreeIndex) -> Result<Option<TreeNode>, CurveTreeError>;
    fn delete_node(&self, index: TreeIndex) -> Result<(), CurveTreeError>;

    fn store_output(&self, index: u64, output: &OutputTuple) -> Result<(), CurveTreeError>;
    fn get_output(&self, index: u64) -> Result<Option<OutputTuple>, CurveTreeError>;

    fn store_metadata(&self, key: &str, value: &[u8]) -> Result<(), CurveTreeError>;
    fn get_metadata(&self, key: &str) -> Result<Option<Vec<u8>>, CurveTreeError>;

    fn begin_batch(&self) -> Result<(), CurveTreeError>;
    fn commit_batch(&self) -> Result<(), CurveTreeError>;
    fn abort_batch(&self) -> Result<(), CurveTreeError>;

    /// Number of outputs the backend holds, derived without tree metadata.
    fn output_count(&self) -> Result<u64, CurveTreeError>;
}

/// Volatile [`TreeStore`] backed by `BTreeMap`s.
///
/// Writes apply immediately; batch calls are accepted but carry no
/// transactional weight. The tree validates everything before storing, so
/// nothing here ever needs rolling back.
#[derive(Debug, Default)]
pub struct MemTreeStore {
    nodes: RefCell<BTreeMap<TreeIndex, TreeNode>>,
    outputs: RefCell<BTreeMap<u64, OutputTuple>>,
    metadata: RefCell<BTreeMap<String, Vec<u8>>>,
}

impl MemTreeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TreeStore for MemTreeStore {
    fn store_node(&self, index: TreeIndex, node: &TreeNode) -> Result<(), CurveTreeError> {
        self.nodes.borrow_mut().insert(index, *node);
        Ok(())
    }

    fn get_node(&self, index: TreeIndex) -> Result<Option<TreeNode>, CurveTreeError> {
        Ok(self.nodes.borrow().get(&index).copied())
    }

    fn delete_node(&self, index: TreeIndex) -> Result<(), CurveTreeError> {
        self.nodes.borrow_mut().remove(&index);
        Ok(())
    }

    fn store_output(&self, index: u64, output: &OutputTuple) -> Result<(), CurveTreeError> {
        self.outputs.borrow_mut().insert(index, *output);
        Ok(())
    }

    fn get_output(&self, index: u64) -> Result<Option<OutputTuple>, CurveTreeError> {
        Ok(self.outputs.borrow().get(&index).copied())
    }

    fn store_metadata(&self, key: &str, value: &[u8]) -> Result<(), CurveTreeError> {
        self.metadata
            .borrow_mut()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get_metadata(&self, key: &str) -> Result<Option<Vec<u8>>, CurveTreeError> {
        Ok(self.metadata.borrow().get(key).cloned())
    }

    fn begin_batch(&self) -> Result<(), CurveTreeError> {
        Ok(())
    }

    fn commit_batch(&self) -> Result<(), CurveTreeError> {
        Ok(())
    }

    fn abort_batch(&self) -> Result<(), CurveTreeError> {
        Ok(())
    }

    fn output_count(&self) -> Result<u64, CurveTreeError> {
        Ok(self.outputs.borrow().len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;

    use super::*;
    use crate::test_utils::sample_output;

    #[test]
    fn node_store_and_delete() {
        let store = MemTreeStore::new();
        let index = TreeIndex::new(2, 5);
        let node = TreeNode::new(ED25519_BASEPOINT_POINT, 3);

        assert!(store.get_node(index).unwrap().is_none());
        store.store_node(index, &node).unwrap();
        assert_eq!(store.get_node(index).unwrap(), Some(node));
        store.delete_node(index).unwrap();
        assert!(store.get_node(index).unwrap().is_none());
    }

    #[test]
    fn output_count_tracks_outputs() {
        let store = MemTreeStore::new();
        assert_eq!(store.output_count().unwrap(), 0);
        for i in 0..5 {
            store.store_output(i, &sample_output(i)).unwrap();
        }
        assert_eq!(store.output_count().unwrap(), 5);
        assert_eq!(store.get_output(3).unwrap(), Some(sample_output(3)));
        assert!(store.get_output(5).unwrap().is_none());
    }

    #[test]
    fn metadata_round_trips() {
        let store = MemTreeStore::new();
        store.store_metadata("output_count", &7u64.to_le_bytes()).unwrap();
        assert_eq!(
            store.get_metadata("output_count").unwrap(),
            Some(7u64.to_le_bytes().to_vec())
        );
        assert!(store.get_metadata("missing").unwrap().is_none());
    }
}
