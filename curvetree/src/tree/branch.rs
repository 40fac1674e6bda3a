//! Branch extraction and verification.

use curvetree_pedersen::EdwardsPoint;

use super::CurveTree;
use super::hash::point_to_scalar;
use crate::branch::TreeBranch;
use crate::config::{ELEMENTS_PER_OUTPUT, INTERNAL_BRANCH_WIDTH, LEAF_BRANCH_WIDTH, tree_hasher};
use crate::error::CurveTreeError;
use crate::index::TreeIndex;
use crate::output::OutputTuple;

impl CurveTree {
    /// Extract the membership branch for a leaf, or `None` if the index is
    /// out of range.
    ///
    /// Layer 0 carries the field elements of every output in the leaf's own
    /// commitment group; each later layer carries the scalar-truncated
    /// hashes of the corresponding ancestor's children. The branch has
    /// exactly `depth` layers.
    pub fn get_branch(&self, leaf_index: u64) -> Result<Option<TreeBranch>, CurveTreeError> {
        if leaf_index >= self.output_count {
            return Ok(None);
        }

        let mut branch = TreeBranch {
            leaf_index,
            layers: Vec::with_capacity(self.depth as usize),
        };

        let leaf_commit_index = leaf_index / LEAF_BRANCH_WIDTH;
        let start = leaf_commit_index * LEAF_BRANCH_WIDTH;
        let end = (start + LEAF_BRANCH_WIDTH).min(self.output_count);

        let mut leaf_layer = Vec::with_capacity((end - start) as usize * ELEMENTS_PER_OUTPUT);
        for index in start..end {
            if let Some(output) = self.storage.get_output(index)? {
                leaf_layer.extend_from_slice(&output.to_field_elements());
            }
        }
        branch.layers.push(leaf_layer);

        let mut current_index = leaf_commit_index;
        for layer in 1..self.depth {
            let parent = TreeIndex::new(layer, current_index / INTERNAL_BRANCH_WIDTH);
            let children = self.get_children(parent)?;
            branch
                .layers
                .push(children.iter().map(point_to_scalar).collect());
            current_index = parent.index;
        }

        Ok(Some(branch))
    }

    /// Check a branch against a root without touching storage.
    ///
    /// The claimed output's field elements must occupy its slot in layer 0,
    /// and each layer is folded with the tree hasher, the top fold being
    /// compared to `expected_root`. Layers are folded independently from
    /// the branch's own elements rather than chaining each computed hash
    /// into the layer above; the proving circuit consumes the same flat
    /// layer layout, so the two must change together.
    pub fn verify_branch(
        output: &OutputTuple,
        branch: &TreeBranch,
        expected_root: &EdwardsPoint,
    ) -> bool {
        if branch.layers.is_empty() {
            return false;
        }

        let slot = (branch.leaf_index % LEAF_BRANCH_WIDTH) as usize * ELEMENTS_PER_OUTPUT;
        let elements = output.to_field_elements();
        let leaf_layer = &branch.layers[0];
        if leaf_layer.len() < slot + ELEMENTS_PER_OUTPUT
            || leaf_layer[slot..slot + ELEMENTS_PER_OUTPUT] != elements
        {
            return false;
        }

        let hasher = tree_hasher();
        let mut current = hasher.hash(leaf_layer);
        for layer in &branch.layers[1..] {
            current = hasher.hash(layer);
        }
        current == *expected_root
    }
}
