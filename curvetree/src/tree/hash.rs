//! Hash computations shared by path updates, rebuilds, and extraction.

use curvetree_pedersen::{EdwardsPoint, Scalar, scalar_from_bytes_wide};

use super::CurveTree;
use crate::config::{INTERNAL_BRANCH_WIDTH, LEAF_BRANCH_WIDTH, tree_hasher};
use crate::error::CurveTreeError;
use crate::index::TreeIndex;

/// Truncate a point to a scalar for folding into the parent layer.
pub(super) fn point_to_scalar(point: &EdwardsPoint) -> Scalar {
    scalar_from_bytes_wide(point.compress().as_bytes())
}

impl CurveTree {
    /// Pedersen-hash the concatenated field elements of every output in
    /// leaf-commitment group `leaf_commit_index`.
    pub(super) fn compute_leaf_node(
        &self,
        leaf_commit_index: u64,
    ) -> Result<EdwardsPoint, CurveTreeError> {
        let start = leaf_commit_index * LEAF_BRANCH_WIDTH;
        let end = (start + LEAF_BRANCH_WIDTH).min(self.output_count);

        let mut elements = Vec::new();
        for index in start..end {
            if let Some(output) = self.storage.get_output(index)? {
                elements.extend_from_slice(&output.to_field_elements());
            }
        }
        Ok(tree_hasher().hash(&elements))
    }

    /// Fold child hashes into a parent hash; empty input hashes to init.
    pub(super) fn compute_node_hash(&self, children: &[EdwardsPoint]) -> EdwardsPoint {
        let scalars: Vec<Scalar> = children.iter().map(point_to_scalar).collect();
        tree_hasher().hash(&scalars)
    }

    /// Hashes of the existing children of `parent`, in slot order.
    ///
    /// `parent.layer` must be at least 1. Missing frontier children are
    /// skipped, so the result length is the parent's effective child count.
    pub(super) fn get_children(
        &self,
        parent: TreeIndex,
    ) -> Result<Vec<EdwardsPoint>, CurveTreeError> {
        let child_layer = parent.layer - 1;
        let start = parent.index * INTERNAL_BRANCH_WIDTH;
        let end = (start + INTERNAL_BRANCH_WIDTH).min(self.nodes_at_layer(child_layer));

        let mut children = Vec::with_capacity((end.saturating_sub(start)) as usize);
        for index in start..end {
            if let Some(node) = self.storage.get_node(TreeIndex::new(child_layer, index))? {
                children.push(node.hash);
            }
        }
        Ok(children)
    }
}
