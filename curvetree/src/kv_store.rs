//! A durable [`TreeStore`] built on a generic ordered key-value store.
//!
//! # Key Scheme
//!
//! All keys use single-byte prefixes to avoid collisions between record
//! kinds:
//! - `N` + 4-byte BE layer + 8-byte BE index -> 40-byte tree node record
//! - `O` + 8-byte BE output index -> 96-byte output tuple
//! - `M` + metadata key bytes -> raw metadata value

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::CurveTreeError;
use crate::index::{TreeIndex, TreeNode};
use crate::output::OutputTuple;
use crate::store::TreeStore;

/// Key prefix for tree node records.
const PREFIX_NODE: u8 = b'N';
/// Key prefix for output tuples.
const PREFIX_OUTPUT: u8 = b'O';
/// Key prefix for metadata entries.
const PREFIX_METADATA: u8 = b'M';

/// One buffered write inside an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// Ordered key-value storage for curve tree persistence.
///
/// Keys and values are arbitrary byte slices; `prefix_iter` must return
/// entries in key order. `apply_batch` must apply every operation or none.
pub trait KvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, CurveTreeError>;

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), CurveTreeError>;

    /// Delete the value at the given key. No-op if the key does not exist.
    fn delete(&mut self, key: &[u8]) -> Result<(), CurveTreeError>;

    /// All key-value pairs whose key starts with `prefix`, ordered by key.
    #[allow(clippy::type_complexity)]
    fn prefix_iter(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, CurveTreeError>;

    /// Apply a group of writes atomically.
    fn apply_batch(&mut self, ops: Vec<BatchOp>) -> Result<(), CurveTreeError>;
}

/// A simple in-memory [`KvStore`] backed by a `BTreeMap`.
#[derive(Debug, Default, Clone)]
pub struct MemKvStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &BTreeMap<Vec<u8>, Vec<u8>> {
        &self.data
    }
}

impl KvStore for MemKvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, CurveTreeError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), CurveTreeError> {
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), CurveTreeError> {
        self.data.remove(key);
        Ok(())
    }

    fn prefix_iter(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, CurveTreeError> {
        let result: Vec<_> = self
            .data
            .range::<Vec<u8>, _>(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(result)
    }

    fn apply_batch(&mut self, ops: Vec<BatchOp>) -> Result<(), CurveTreeError> {
        for op in ops {
            match op {
                BatchOp::Put { key, value } => {
                    self.data.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    self.data.remove(&key);
                }
            }
        }
        Ok(())
    }
}

/// Encode a node coordinate into a 13-byte key.
fn node_key(index: TreeIndex) -> [u8; 13] {
    let mut key = [0u8; 13];
    key[0] = PREFIX_NODE;
    key[1..5].copy_from_slice(&index.layer.to_be_bytes());
    key[5..13].copy_from_slice(&index.index.to_be_bytes());
    key
}

/// Encode an output index into a 9-byte key.
fn output_key(index: u64) -> [u8; 9] {
    let mut key = [0u8; 9];
    key[0] = PREFIX_OUTPUT;
    key[1..9].copy_from_slice(&index.to_be_bytes());
    key
}

/// Encode a metadata key.
fn metadata_key(key: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(1 + key.len());
    bytes.push(PREFIX_METADATA);
    bytes.extend_from_slice(key.as_bytes());
    bytes
}

/// A durable [`TreeStore`] adapting any [`KvStore`].
///
/// Batched writes are buffered in an overlay map and handed to
/// [`KvStore::apply_batch`] at the outermost commit, so a failed or aborted
/// batch leaves the backing store untouched. Reads consult the overlay
/// first while a batch is open. Aborting at any nesting level discards the
/// whole outermost transaction.
pub struct KvTreeStore<S: KvStore> {
    kv: RefCell<S>,
    batch_depth: Cell<u32>,
    pending: RefCell<BTreeMap<Vec<u8>, Option<Vec<u8>>>>,
    cached_output_count: Cell<Option<u64>>,
}

impl<S: KvStore> KvTreeStore<S> {
    pub fn new(kv: S) -> Self {
        Self {
            kv: RefCell::new(kv),
            batch_depth: Cell::new(0),
            pending: RefCell::new(BTreeMap::new()),
            cached_output_count: Cell::new(None),
        }
    }

    /// Consume this wrapper and return the underlying store.
    ///
    /// Any open batch is discarded.
    pub fn into_inner(self) -> S {
        self.kv.into_inner()
    }

    fn in_batch(&self) -> bool {
        self.batch_depth.get() > 0
    }

    fn read(&self, key: &[u8]) -> Result<Option<Vec<u8>>, CurveTreeError> {
        if self.in_batch() {
            if let Some(pending) = self.pending.borrow().get(key) {
                return Ok(pending.clone());
            }
        }
        self.kv.borrow().get(key)
    }

    fn write(&self, key: Vec<u8>, value: Vec<u8>) -> Result<(), CurveTreeError> {
        if self.in_batch() {
            self.pending.borrow_mut().insert(key, Some(value));
            Ok(())
        } else {
            self.kv.borrow_mut().put(&key, &value)
        }
    }

    fn remove(&self, key: Vec<u8>) -> Result<(), CurveTreeError> {
        if self.in_batch() {
            self.pending.borrow_mut().insert(key, None);
            Ok(())
        } else {
            self.kv.borrow_mut().delete(&key)
        }
    }

    /// Count output records, overlaying pending writes onto the store scan.
    fn scan_output_count(&self) -> Result<u64, CurveTreeError> {
        let mut keys: BTreeSet<Vec<u8>> = self
            .kv
            .borrow()
            .prefix_iter(&[PREFIX_OUTPUT])?
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        if self.in_batch() {
            for (key, value) in self.pending.borrow().iter() {
                if key.first() != Some(&PREFIX_OUTPUT) {
                    continue;
                }
                match value {
                    Some(_) => {
                        keys.insert(key.clone());
                    }
                    None => {
                        keys.remove(key);
                    }
                }
            }
        }
        Ok(keys.len() as u64)
    }
}

impl<S: KvStore> TreeStore for KvTreeStore<S> {
    fn store_node(&self, index: TreeIndex, node: &TreeNode) -> Result<(), CurveTreeError> {
        self.write(node_key(index).to_vec(), node.to_bytes().to_vec())
    }

    fn get_node(&self, index: TreeIndex) -> Result<Option<TreeNode>, CurveTreeError> {
        match self.read(&node_key(index))? {
            Some(bytes) => Ok(Some(TreeNode::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    fn delete_node(&self, index: TreeIndex) -> Result<(), CurveTreeError> {
        self.remove(node_key(index).to_vec())
    }

    fn store_output(&self, index: u64, output: &OutputTuple) -> Result<(), CurveTreeError> {
        self.cached_output_count.set(None);
        self.write(output_key(index).to_vec(), output.to_bytes().to_vec())
    }

    fn get_output(&self, index: u64) -> Result<Option<OutputTuple>, CurveTreeError> {
        match self.read(&output_key(index))? {
            Some(bytes) => {
                let output = OutputTuple::from_bytes(&bytes).ok_or_else(|| {
                    CurveTreeError::CorruptedData(format!(
                        "stored output {index} does not decode to a valid tuple"
                    ))
                })?;
                Ok(Some(output))
            }
            None => Ok(None),
        }
    }

    fn store_metadata(&self, key: &str, value: &[u8]) -> Result<(), CurveTreeError> {
        self.write(metadata_key(key), value.to_vec())
    }

    fn get_metadata(&self, key: &str) -> Result<Option<Vec<u8>>, CurveTreeError> {
        self.read(&metadata_key(key))
    }

    fn begin_batch(&self) -> Result<(), CurveTreeError> {
        self.batch_depth.set(self.batch_depth.get() + 1);
        Ok(())
    }

    fn commit_batch(&self) -> Result<(), CurveTreeError> {
        let depth = self.batch_depth.get();
        if depth == 0 {
            return Err(CurveTreeError::StorageError(
                "commit without an open batch".to_string(),
            ));
        }
        self.batch_depth.set(depth - 1);
        if depth == 1 {
            let pending = std::mem::take(&mut *self.pending.borrow_mut());
            let ops: Vec<BatchOp> = pending
                .into_iter()
                .map(|(key, value)| match value {
                    Some(value) => BatchOp::Put { key, value },
                    None => BatchOp::Delete { key },
                })
                .collect();
            self.kv.borrow_mut().apply_batch(ops)?;
        }
        Ok(())
    }

    fn abort_batch(&self) -> Result<(), CurveTreeError> {
        if self.batch_depth.get() == 0 {
            return Ok(());
        }
        self.batch_depth.set(0);
        self.pending.borrow_mut().clear();
        self.cached_output_count.set(None);
        Ok(())
    }

    fn output_count(&self) -> Result<u64, CurveTreeError> {
        if !self.in_batch() {
            if let Some(count) = self.cached_output_count.get() {
                return Ok(count);
            }
        }
        let count = self.scan_output_count()?;
        if !self.in_batch() {
            self.cached_output_count.set(Some(count));
        }
        Ok(count)
    }
}
