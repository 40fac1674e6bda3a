//! Bulk tree construction.

use std::sync::Arc;

use crate::error::CurveTreeError;
use crate::output::OutputTuple;
use crate::store::TreeStore;
use crate::tree::CurveTree;

/// Progress callback: `(outputs accumulated, total accumulated)`.
pub type ProgressCallback = Box<dyn FnMut(u64, u64)>;

/// Accumulates outputs in memory and finalizes a tree in one batch insert.
///
/// Exists for bulk construction, such as replaying chain history into a new
/// tree, as opposed to steady-state per-output insertion.
pub struct CurveTreeBuilder {
    storage: Arc<dyn TreeStore>,
    outputs: Vec<OutputTuple>,
    progress: Option<ProgressCallback>,
}

impl CurveTreeBuilder {
    pub fn new(storage: Arc<dyn TreeStore>) -> Self {
        Self {
            storage,
            outputs: Vec::new(),
            progress: None,
        }
    }

    /// Register a callback invoked after every accumulation call.
    pub fn set_progress_callback(&mut self, callback: ProgressCallback) {
        self.progress = Some(callback);
    }

    /// Accumulate outputs without touching storage.
    pub fn add_outputs(&mut self, outputs: &[OutputTuple]) {
        self.outputs.extend_from_slice(outputs);
        if let Some(progress) = self.progress.as_mut() {
            let count = self.outputs.len() as u64;
            progress(count, count);
        }
    }

    /// Outputs accumulated so far.
    pub fn output_count(&self) -> u64 {
        self.outputs.len() as u64
    }

    /// Build a tree over the builder's storage and batch-insert everything
    /// accumulated, consuming the builder.
    pub fn finalize(self) -> Result<CurveTree, CurveTreeError> {
        let mut tree = CurveTree::new(self.storage)?;
        tree.add_outputs(&self.outputs)?;
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::store::MemTreeStore;
    use crate::test_utils::sample_outputs;

    #[test]
    fn finalize_matches_direct_batch_insert() {
        let outputs = sample_outputs(50);

        let mut builder = CurveTreeBuilder::new(Arc::new(MemTreeStore::new()));
        builder.add_outputs(&outputs[..20]);
        builder.add_outputs(&outputs[20..]);
        assert_eq!(builder.output_count(), 50);
        let built = builder.finalize().unwrap();

        let mut direct = CurveTree::in_memory();
        direct.add_outputs(&outputs).unwrap();

        assert_eq!(built.output_count(), direct.output_count());
        assert_eq!(built.get_root().unwrap(), direct.get_root().unwrap());
    }

    #[test]
    fn progress_reported_per_accumulation() {
        let seen: Rc<RefCell<Vec<u64>>> = Rc::default();
        let recorded = Rc::clone(&seen);

        let mut builder = CurveTreeBuilder::new(Arc::new(MemTreeStore::new()));
        builder.set_progress_callback(Box::new(move |count, _total| {
            recorded.borrow_mut().push(count);
        }));

        let outputs = sample_outputs(5);
        builder.add_outputs(&outputs[..2]);
        builder.add_outputs(&outputs[2..]);

        assert_eq!(*seen.borrow(), vec![2, 5]);
    }

    #[test]
    fn finalize_rejects_invalid_accumulated_output() {
        use curve25519_dalek::traits::Identity;
        use curvetree_pedersen::EdwardsPoint;

        let mut bad = sample_outputs(1)[0];
        bad.one_time_key = EdwardsPoint::identity().compress();

        let mut builder = CurveTreeBuilder::new(Arc::new(MemTreeStore::new()));
        builder.add_outputs(&[bad]);
        assert!(matches!(
            builder.finalize(),
            Err(CurveTreeError::InvalidOutput(_))
        ));
    }
}
