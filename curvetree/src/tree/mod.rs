//! The curve tree engine.
//!
//! A tree of Pedersen hashes over Ed25519: layer 0 commits to groups of
//! [`LEAF_BRANCH_WIDTH`] outputs (six field elements each), every higher
//! layer folds up to [`INTERNAL_BRANCH_WIDTH`] child hashes, and the single
//! node of the top layer is the root. Depth and node counts are derived
//! analytically from the output count; frontier nodes may be partially
//! filled and are recomputed in place as outputs arrive.
//!
//! # Concurrency
//!
//! The engine is single-writer: mutation is synchronous and the root cache
//! uses unsynchronized interior mutability. Callers sharing one tree across
//! threads must serialize access externally.

mod branch;
mod hash;
mod insert;
mod rebuild;
#[cfg(test)]
mod tests;

use std::cell::Cell;
use std::sync::Arc;

use curvetree_pedersen::EdwardsPoint;

use crate::config::{INTERNAL_BRANCH_WIDTH, LEAF_BRANCH_WIDTH, tree_hasher};
use crate::error::CurveTreeError;
use crate::index::TreeIndex;
use crate::store::{MemTreeStore, TreeStore};

/// Metadata key for the persisted output count (8 bytes LE).
const META_OUTPUT_COUNT: &str = "output_count";
/// Metadata key for the persisted depth (4 bytes LE).
const META_DEPTH: &str = "depth";

/// Batch inserts above this size trigger a full rebuild instead of
/// per-output path updates, which duplicate ancestor work super-linearly.
const REBUILD_THRESHOLD: usize = 100;

/// The output accumulator: an authenticated tree of Pedersen hashes whose
/// branches feed full-chain membership proofs.
pub struct CurveTree {
    storage: Arc<dyn TreeStore>,
    output_count: u64,
    depth: u32,
    cached_root: Cell<EdwardsPoint>,
    root_dirty: Cell<bool>,
}

impl CurveTree {
    /// Open a tree over the given storage, restoring any persisted state.
    pub fn new(storage: Arc<dyn TreeStore>) -> Result<Self, CurveTreeError> {
        let mut tree = Self {
            storage,
            output_count: 0,
            depth: 0,
            cached_root: Cell::new(tree_hasher().init()),
            root_dirty: Cell::new(true),
        };
        tree.load()?;
        Ok(tree)
    }

    /// A fresh tree over volatile in-memory storage.
    pub fn in_memory() -> Self {
        Self {
            storage: Arc::new(MemTreeStore::new()),
            output_count: 0,
            depth: 0,
            cached_root: Cell::new(tree_hasher().init()),
            root_dirty: Cell::new(true),
        }
    }

    pub fn output_count(&self) -> u64 {
        self.output_count
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn storage(&self) -> &Arc<dyn TreeStore> {
        &self.storage
    }

    /// Tree depth for a given output count: one leaf-commitment layer, plus
    /// one layer per fold until a single node remains.
    pub fn calculate_depth(output_count: u64) -> u32 {
        if output_count == 0 {
            return 0;
        }
        let mut nodes = output_count.div_ceil(LEAF_BRANCH_WIDTH);
        let mut depth = 1;
        while nodes > 1 {
            nodes = nodes.div_ceil(INTERNAL_BRANCH_WIDTH);
            depth += 1;
        }
        depth
    }

    /// Number of nodes at `layer` for the current output count.
    pub(crate) fn nodes_at_layer(&self, layer: u32) -> u64 {
        let mut nodes = self.output_count.div_ceil(LEAF_BRANCH_WIDTH);
        for _ in 0..layer {
            nodes = nodes.div_ceil(INTERNAL_BRANCH_WIDTH);
        }
        nodes
    }

    /// The current root.
    ///
    /// Empty trees hash to the primitive's init point. Otherwise the cached
    /// root is returned, refreshed from storage if an insert or rebuild has
    /// run since the last read. The cache is derived state only; storage
    /// stays authoritative.
    pub fn get_root(&self) -> Result<EdwardsPoint, CurveTreeError> {
        if self.output_count == 0 {
            return Ok(tree_hasher().init());
        }
        if self.root_dirty.get() {
            let root_layer = self.depth.saturating_sub(1);
            let root = match self.storage.get_node(TreeIndex::new(root_layer, 0))? {
                Some(node) => node.hash,
                None => tree_hasher().init(),
            };
            self.cached_root.set(root);
            self.root_dirty.set(false);
        }
        Ok(self.cached_root.get())
    }

    /// Persist the output count and depth so the next open skips a rescan.
    pub fn save(&self) -> Result<(), CurveTreeError> {
        self.storage
            .store_metadata(META_OUTPUT_COUNT, &self.output_count.to_le_bytes())?;
        self.storage
            .store_metadata(META_DEPTH, &self.depth.to_le_bytes())
    }

    /// Restore count and depth from metadata, falling back to the storage
    /// backend's own count and the analytic depth formula.
    pub fn load(&mut self) -> Result<(), CurveTreeError> {
        self.output_count = match self.storage.get_metadata(META_OUTPUT_COUNT)? {
            Some(bytes) if bytes.len() == 8 => {
                u64::from_le_bytes(bytes.try_into().map_err(|_| {
                    CurveTreeError::CorruptedData("output_count metadata".to_string())
                })?)
            }
            _ => self.storage.output_count()?,
        };
        self.depth = match self.storage.get_metadata(META_DEPTH)? {
            Some(bytes) if bytes.len() == 4 => u32::from_le_bytes(
                bytes
                    .try_into()
                    .map_err(|_| CurveTreeError::CorruptedData("depth metadata".to_string()))?,
            ),
            _ => Self::calculate_depth(self.output_count),
        };
        self.root_dirty.set(true);
        Ok(())
    }
}
