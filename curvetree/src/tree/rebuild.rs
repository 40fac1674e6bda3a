//! Full reconstruction and offline integrity checking.

use super::CurveTree;
use crate::config::LEAF_BRANCH_WIDTH;
use crate::error::CurveTreeError;
use crate::index::{TreeIndex, TreeNode};

impl CurveTree {
    /// Recompute every node bottom-up from the stored outputs, inside one
    /// storage batch. Joins an already-open batch if the caller has one.
    pub fn rebuild(&mut self) -> Result<(), CurveTreeError> {
        if self.output_count == 0 {
            return Ok(());
        }

        self.storage.begin_batch()?;
        match self.rebuild_in_batch() {
            Ok(()) => {
                self.storage.commit_batch()?;
                self.root_dirty.set(true);
                Ok(())
            }
            Err(e) => {
                self.storage.abort_batch()?;
                Err(e)
            }
        }
    }

    fn rebuild_in_batch(&mut self) -> Result<(), CurveTreeError> {
        let num_leaf_commits = self.nodes_at_layer(0);
        for index in 0..num_leaf_commits {
            let hash = self.compute_leaf_node(index)?;
            let start = index * LEAF_BRANCH_WIDTH;
            let end = (start + LEAF_BRANCH_WIDTH).min(self.output_count);
            self.storage.store_node(
                TreeIndex::new(0, index),
                &TreeNode::new(hash, end - start),
            )?;
        }

        for layer in 1..self.depth {
            for index in 0..self.nodes_at_layer(layer) {
                let parent = TreeIndex::new(layer, index);
                let children = self.get_children(parent)?;
                if !children.is_empty() {
                    let hash = self.compute_node_hash(&children);
                    self.storage
                        .store_node(parent, &TreeNode::new(hash, children.len() as u64))?;
                }
            }
        }
        Ok(())
    }

    /// Re-derive every node hash without writing and compare against what
    /// storage holds. Returns false on the first missing node or mismatch.
    pub fn verify_integrity(&self) -> Result<bool, CurveTreeError> {
        if self.output_count == 0 {
            return Ok(true);
        }

        for index in 0..self.nodes_at_layer(0) {
            let Some(stored) = self.storage.get_node(TreeIndex::new(0, index))? else {
                return Ok(false);
            };
            if stored.hash != self.compute_leaf_node(index)? {
                return Ok(false);
            }
        }

        for layer in 1..self.depth {
            for index in 0..self.nodes_at_layer(layer) {
                let parent = TreeIndex::new(layer, index);
                let Some(stored) = self.storage.get_node(parent)? else {
                    return Ok(false);
                };
                let children = self.get_children(parent)?;
                if stored.hash != self.compute_node_hash(&children) {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}
