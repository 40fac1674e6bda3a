use std::sync::Arc;

use curve25519_dalek::traits::Identity;
use curvetree_pedersen::EdwardsPoint;

use crate::config::{INTERNAL_BRANCH_WIDTH, LEAF_BRANCH_WIDTH, tree_hasher};
use crate::error::CurveTreeError;
use crate::index::TreeIndex;
use crate::kv_store::{BatchOp, KvStore, KvTreeStore, MemKvStore};
use crate::store::{MemTreeStore, TreeStore};
use crate::test_utils::{sample_output, sample_outputs};
use crate::tree::CurveTree;

fn invalid_output() -> crate::output::OutputTuple {
    let mut output = sample_output(0);
    output.commitment = EdwardsPoint::identity().compress();
    output
}

/// A `MemKvStore` whose atomic batch application always fails.
struct FailingBatchKv(MemKvStore);

impl KvStore for FailingBatchKv {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, CurveTreeError> {
        self.0.get(key)
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), CurveTreeError> {
        self.0.put(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), CurveTreeError> {
        self.0.delete(key)
    }

    fn prefix_iter(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, CurveTreeError> {
        self.0.prefix_iter(prefix)
    }

    fn apply_batch(&mut self, _ops: Vec<BatchOp>) -> Result<(), CurveTreeError> {
        Err(CurveTreeError::StorageError("disk full".to_string()))
    }
}

#[test]
fn empty_tree() {
    let tree = CurveTree::in_memory();
    assert_eq!(tree.output_count(), 0);
    assert_eq!(tree.depth(), 0);
    assert_eq!(tree.get_root().unwrap(), tree_hasher().init());
}

#[test]
fn depth_formula() {
    assert_eq!(CurveTree::calculate_depth(0), 0);
    assert_eq!(CurveTree::calculate_depth(1), 1);
    assert_eq!(CurveTree::calculate_depth(LEAF_BRANCH_WIDTH), 1);
    assert_eq!(CurveTree::calculate_depth(LEAF_BRANCH_WIDTH + 1), 2);
    assert_eq!(
        CurveTree::calculate_depth(LEAF_BRANCH_WIDTH * INTERNAL_BRANCH_WIDTH),
        2
    );
    assert_eq!(
        CurveTree::calculate_depth(LEAF_BRANCH_WIDTH * INTERNAL_BRANCH_WIDTH + 1),
        3
    );
}

#[test]
fn single_insert_assigns_sequential_indices() {
    let mut tree = CurveTree::in_memory();
    for i in 0..5 {
        let index = tree.add_output(&sample_output(i)).unwrap();
        assert_eq!(index, i);
    }
    assert_eq!(tree.output_count(), 5);
    assert_eq!(tree.depth(), 1);
    assert_eq!(tree.get_output(3).unwrap(), Some(sample_output(3)));
    assert!(tree.has_output(4).unwrap());
    assert!(!tree.has_output(5).unwrap());
    assert_ne!(tree.get_root().unwrap(), tree_hasher().init());
}

#[test]
fn invalid_output_rejected_without_state_change() {
    let mut tree = CurveTree::in_memory();
    tree.add_output(&sample_output(0)).unwrap();
    let root = tree.get_root().unwrap();

    assert!(matches!(
        tree.add_output(&invalid_output()),
        Err(CurveTreeError::InvalidOutput(_))
    ));
    assert_eq!(tree.output_count(), 1);
    assert_eq!(tree.get_root().unwrap(), root);
}

#[test]
fn invalid_output_in_batch_rejects_whole_batch() {
    let store = Arc::new(KvTreeStore::new(MemKvStore::new()));
    let mut tree = CurveTree::new(store.clone()).unwrap();

    let mut outputs = sample_outputs(10);
    outputs[7] = invalid_output();

    assert!(matches!(
        tree.add_outputs(&outputs),
        Err(CurveTreeError::InvalidOutput(_))
    ));
    assert_eq!(tree.output_count(), 0);
    assert_eq!(tree.depth(), 0);
    assert_eq!(store.output_count().unwrap(), 0);
    assert_eq!(tree.get_root().unwrap(), tree_hasher().init());
}

#[test]
fn failed_commit_rolls_back_engine_counters() {
    let store = Arc::new(KvTreeStore::new(FailingBatchKv(MemKvStore::new())));
    let mut tree = CurveTree::new(store.clone()).unwrap();

    assert!(matches!(
        tree.add_outputs(&sample_outputs(5)),
        Err(CurveTreeError::StorageError(_))
    ));

    // The store committed nothing, so the engine must not count anything.
    assert_eq!(store.output_count().unwrap(), 0);
    assert_eq!(tree.output_count(), 0);
    assert_eq!(tree.depth(), 0);
    assert_eq!(tree.get_root().unwrap(), tree_hasher().init());
    assert!(tree.get_branch(0).unwrap().is_none());
}

#[test]
fn two_leaf_groups_share_one_root() {
    // One output past a full group: two leaf commitments, depth 2.
    let mut tree = CurveTree::in_memory();
    let outputs = sample_outputs(LEAF_BRANCH_WIDTH + 1);
    tree.add_outputs(&outputs).unwrap();

    assert_eq!(tree.depth(), 2);
    let full = tree.storage().get_node(TreeIndex::new(0, 0)).unwrap().unwrap();
    let frontier = tree.storage().get_node(TreeIndex::new(0, 1)).unwrap().unwrap();
    assert_eq!(full.child_count, LEAF_BRANCH_WIDTH);
    assert_eq!(frontier.child_count, 1);

    let root = tree.get_root().unwrap();
    for leaf_index in [0, LEAF_BRANCH_WIDTH - 1, LEAF_BRANCH_WIDTH] {
        let branch = tree.get_branch(leaf_index).unwrap().unwrap();
        assert_eq!(branch.depth(), tree.depth());
        assert!(CurveTree::verify_branch(
            &outputs[leaf_index as usize],
            &branch,
            &root
        ));
    }
}

#[test]
fn three_layer_tree_updates_and_verifies() {
    // Enough for two full internal folds; the spillover output then grows
    // the tree to depth 3 and its path update crosses two internal layers.
    let full = LEAF_BRANCH_WIDTH * INTERNAL_BRANCH_WIDTH;
    let outputs = sample_outputs(full + 1);

    let mut tree = CurveTree::in_memory();
    tree.add_outputs(&outputs[..full as usize]).unwrap();
    assert_eq!(tree.depth(), 2);

    tree.add_output(&outputs[full as usize]).unwrap();
    assert_eq!(tree.depth(), 3);
    assert!(tree.verify_integrity().unwrap());

    let root = tree.get_root().unwrap();
    for leaf_index in [0, LEAF_BRANCH_WIDTH, full - 1, full] {
        let branch = tree.get_branch(leaf_index).unwrap().unwrap();
        assert_eq!(branch.depth(), 3);
        assert!(
            CurveTree::verify_branch(&outputs[leaf_index as usize], &branch, &root),
            "leaf {leaf_index}"
        );
    }
}

#[test]
fn branch_out_of_range_is_none() {
    let mut tree = CurveTree::in_memory();
    tree.add_outputs(&sample_outputs(4)).unwrap();
    assert!(tree.get_branch(3).unwrap().is_some());
    assert!(tree.get_branch(4).unwrap().is_none());
}

#[test]
fn every_branch_verifies() {
    let mut tree = CurveTree::in_memory();
    let outputs = sample_outputs(45);
    tree.add_outputs(&outputs).unwrap();
    let root = tree.get_root().unwrap();

    for (i, output) in outputs.iter().enumerate() {
        let branch = tree.get_branch(i as u64).unwrap().unwrap();
        assert_eq!(branch.depth(), tree.depth());
        assert!(
            CurveTree::verify_branch(output, &branch, &root),
            "branch {i} failed"
        );
    }
}

#[test]
fn branch_verification_failures() {
    let mut tree = CurveTree::in_memory();
    let outputs = sample_outputs(40);
    tree.add_outputs(&outputs).unwrap();
    let root = tree.get_root().unwrap();
    let branch = tree.get_branch(5).unwrap().unwrap();

    // Wrong output for the claimed slot.
    assert!(!CurveTree::verify_branch(&outputs[6], &branch, &root));

    // Wrong root.
    let wrong_root = tree_hasher().init();
    assert!(!CurveTree::verify_branch(&outputs[5], &branch, &wrong_root));

    // Tampered top layer.
    let mut tampered = branch.clone();
    let last = tampered.layers.last_mut().unwrap();
    last[0] += curvetree_pedersen::Scalar::ONE;
    assert!(!CurveTree::verify_branch(&outputs[5], &tampered, &root));

    // No layers at all.
    let empty = crate::branch::TreeBranch::default();
    assert!(!CurveTree::verify_branch(&outputs[5], &empty, &root));
}

#[test]
fn incremental_and_rebuild_agree() {
    let outputs = sample_outputs(80);

    let mut incremental = CurveTree::in_memory();
    for output in &outputs {
        incremental.add_output(output).unwrap();
    }
    let incremental_root = incremental.get_root().unwrap();

    incremental.rebuild().unwrap();
    assert!(incremental.verify_integrity().unwrap());
    assert_eq!(incremental.get_root().unwrap(), incremental_root);
}

#[test]
fn large_batch_takes_rebuild_path() {
    // Above the rebuild threshold, so the batch path rebuilds wholesale.
    let outputs = sample_outputs(150);

    let mut batched = CurveTree::in_memory();
    batched.add_outputs(&outputs).unwrap();
    assert!(batched.verify_integrity().unwrap());

    let mut incremental = CurveTree::in_memory();
    for output in &outputs {
        incremental.add_output(output).unwrap();
    }

    assert_eq!(batched.depth(), incremental.depth());
    assert_eq!(batched.get_root().unwrap(), incremental.get_root().unwrap());
}

#[test]
fn integrity_detects_missing_and_corrupt_nodes() {
    let mut tree = CurveTree::in_memory();
    tree.add_outputs(&sample_outputs(40)).unwrap();
    assert!(tree.verify_integrity().unwrap());

    // Corrupt a node.
    let index = TreeIndex::new(0, 0);
    let mut node = tree.storage().get_node(index).unwrap().unwrap();
    node.hash = tree_hasher().init();
    tree.storage().store_node(index, &node).unwrap();
    assert!(!tree.verify_integrity().unwrap());

    // Remove it entirely.
    tree.storage().delete_node(index).unwrap();
    assert!(!tree.verify_integrity().unwrap());
}

#[test]
fn kv_tree_matches_memory_tree() {
    let outputs = sample_outputs(42);

    let mut mem_tree = CurveTree::new(Arc::new(MemTreeStore::new())).unwrap();
    let mut kv_tree = CurveTree::new(Arc::new(KvTreeStore::new(MemKvStore::new()))).unwrap();

    mem_tree.add_outputs(&outputs).unwrap();
    kv_tree.add_outputs(&outputs).unwrap();

    assert_eq!(mem_tree.get_root().unwrap(), kv_tree.get_root().unwrap());
    for i in 0..outputs.len() as u64 {
        let mem_branch = mem_tree.get_branch(i).unwrap().unwrap();
        let kv_branch = kv_tree.get_branch(i).unwrap().unwrap();
        assert_eq!(mem_branch.to_bytes(), kv_branch.to_bytes());
    }
}

#[test]
fn save_and_reopen_restores_state() {
    let store = Arc::new(KvTreeStore::new(MemKvStore::new()));
    let outputs = sample_outputs(LEAF_BRANCH_WIDTH + 3);

    let root = {
        let mut tree = CurveTree::new(store.clone()).unwrap();
        tree.add_outputs(&outputs).unwrap();
        tree.save().unwrap();
        tree.get_root().unwrap()
    };

    let reopened = CurveTree::new(store).unwrap();
    assert_eq!(reopened.output_count(), outputs.len() as u64);
    assert_eq!(reopened.depth(), 2);
    assert_eq!(reopened.get_root().unwrap(), root);

    let branch = reopened.get_branch(0).unwrap().unwrap();
    assert!(CurveTree::verify_branch(&outputs[0], &branch, &root));
}

#[test]
fn reopen_without_metadata_falls_back_to_scan() {
    let store = Arc::new(KvTreeStore::new(MemKvStore::new()));
    let outputs = sample_outputs(5);

    {
        let mut tree = CurveTree::new(store.clone()).unwrap();
        tree.add_outputs(&outputs).unwrap();
        // No save(): the reopen must derive its counters.
    }

    let reopened = CurveTree::new(store).unwrap();
    assert_eq!(reopened.output_count(), 5);
    assert_eq!(reopened.depth(), 1);
    assert!(reopened.verify_integrity().unwrap());
}

#[test]
fn mixed_insertion_stays_consistent() {
    let outputs = sample_outputs(60);

    let mut tree = CurveTree::in_memory();
    tree.add_outputs(&outputs[..30]).unwrap();
    for output in &outputs[30..50] {
        tree.add_output(output).unwrap();
    }
    tree.add_outputs(&outputs[50..]).unwrap();

    assert_eq!(tree.output_count(), 60);
    assert!(tree.verify_integrity().unwrap());

    let root = tree.get_root().unwrap();
    let branch = tree.get_branch(59).unwrap().unwrap();
    assert!(CurveTree::verify_branch(&outputs[59], &branch, &root));
}

#[cfg(feature = "sqlite")]
mod sqlite {
    use super::*;
    use crate::sqlite_store::SqliteKvStore;

    #[test]
    fn tree_persists_across_database_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.sqlite");
        let outputs = sample_outputs(41);

        let root = {
            let store = Arc::new(KvTreeStore::new(SqliteKvStore::open(&path).unwrap()));
            let mut tree = CurveTree::new(store).unwrap();
            tree.add_outputs(&outputs).unwrap();
            tree.save().unwrap();
            tree.get_root().unwrap()
        };

        let store = Arc::new(KvTreeStore::new(SqliteKvStore::open(&path).unwrap()));
        let reopened = CurveTree::new(store).unwrap();
        assert_eq!(reopened.output_count(), 41);
        assert_eq!(reopened.get_root().unwrap(), root);
        assert!(reopened.verify_integrity().unwrap());

        let branch = reopened.get_branch(40).unwrap().unwrap();
        assert!(CurveTree::verify_branch(&outputs[40], &branch, &root));
    }
}
