//! Output insertion and incremental path maintenance.

use super::{CurveTree, REBUILD_THRESHOLD};
use crate::config::{INTERNAL_BRANCH_WIDTH, LEAF_BRANCH_WIDTH};
use crate::error::CurveTreeError;
use crate::index::{TreeIndex, TreeNode};
use crate::output::OutputTuple;

impl CurveTree {
    /// Append one output and recompute its path to the root.
    ///
    /// Returns the assigned leaf index. An invalid tuple is rejected before
    /// any state changes.
    pub fn add_output(&mut self, output: &OutputTuple) -> Result<u64, CurveTreeError> {
        if !output.is_valid() {
            return Err(CurveTreeError::InvalidOutput(
                "point failed validation or is the identity".to_string(),
            ));
        }

        let index = self.output_count;
        self.storage.store_output(index, output)?;
        self.output_count += 1;

        // Depth grows monotonically; it is never decremented on insert.
        let new_depth = Self::calculate_depth(self.output_count);
        if new_depth > self.depth {
            self.depth = new_depth;
        }

        self.update_path(index)?;
        self.root_dirty.set(true);
        Ok(index)
    }

    /// Append a batch of outputs inside one atomic storage batch.
    ///
    /// Every tuple is validated before any is stored, so a validation
    /// failure leaves both storage and the tree counters untouched. Large
    /// batches rebuild the whole tree instead of updating each path.
    pub fn add_outputs(&mut self, outputs: &[OutputTuple]) -> Result<Vec<u64>, CurveTreeError> {
        for (i, output) in outputs.iter().enumerate() {
            if !output.is_valid() {
                return Err(CurveTreeError::InvalidOutput(format!(
                    "tuple {i} failed validation"
                )));
            }
        }

        let prior_count = self.output_count;
        let prior_depth = self.depth;

        self.storage.begin_batch()?;
        let result = self.add_outputs_in_batch(outputs).and_then(|indices| {
            self.storage.commit_batch()?;
            Ok(indices)
        });
        match result {
            Ok(indices) => {
                self.root_dirty.set(true);
                Ok(indices)
            }
            // A failed commit lands here too: the engine counters must not
            // outrun what the store actually holds.
            Err(e) => {
                self.output_count = prior_count;
                self.depth = prior_depth;
                self.storage.abort_batch()?;
                Err(e)
            }
        }
    }

    fn add_outputs_in_batch(
        &mut self,
        outputs: &[OutputTuple],
    ) -> Result<Vec<u64>, CurveTreeError> {
        let mut indices = Vec::with_capacity(outputs.len());
        for output in outputs {
            let index = self.output_count;
            self.storage.store_output(index, output)?;
            indices.push(index);
            self.output_count += 1;
        }

        self.depth = Self::calculate_depth(self.output_count);

        if outputs.len() > REBUILD_THRESHOLD {
            self.rebuild()?;
        } else {
            for &index in &indices {
                self.update_path(index)?;
            }
        }
        Ok(indices)
    }

    pub fn get_output(&self, index: u64) -> Result<Option<OutputTuple>, CurveTreeError> {
        self.storage.get_output(index)
    }

    pub fn has_output(&self, index: u64) -> Result<bool, CurveTreeError> {
        Ok(self.storage.get_output(index)?.is_some())
    }

    /// Recompute the leaf commitment owning `leaf_index` and every ancestor
    /// up to one level below the root.
    pub(super) fn update_path(&mut self, leaf_index: u64) -> Result<(), CurveTreeError> {
        let leaf_commit_index = leaf_index / LEAF_BRANCH_WIDTH;

        let hash = self.compute_leaf_node(leaf_commit_index)?;
        let start = leaf_commit_index * LEAF_BRANCH_WIDTH;
        let end = (start + LEAF_BRANCH_WIDTH).min(self.output_count);
        self.storage.store_node(
            TreeIndex::new(0, leaf_commit_index),
            &TreeNode::new(hash, end - start),
        )?;

        let mut current_index = leaf_commit_index;
        for layer in 1..self.depth {
            let parent = TreeIndex::new(layer, current_index / INTERNAL_BRANCH_WIDTH);
            let children = self.get_children(parent)?;
            // A parent with no children yet has no defined hash; skip it.
            if !children.is_empty() {
                let hash = self.compute_node_hash(&children);
                self.storage
                    .store_node(parent, &TreeNode::new(hash, children.len() as u64))?;
            }
            current_index = parent.index;
        }
        Ok(())
    }
}
