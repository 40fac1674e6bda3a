//! A privacy-preserving output accumulator for full-chain membership
//! proofs.
//!
//! The curve tree records shielded-transaction outputs and lets a prover
//! later show, without revealing which one, that an output is a member of
//! the accumulator. It is an authenticated structure whose hash is a
//! Pedersen hash-of-vector over Ed25519 scalars, whose branching factor
//! and depth follow analytically from occupancy, and whose branches are
//! consumed by an external zero-knowledge proving engine.
//!
//! Storage is abstract: [`MemTreeStore`] keeps everything in memory, and
//! [`KvTreeStore`] adapts any ordered [`KvStore`] (including the
//! SQLite-backed [`SqliteKvStore`] behind the `sqlite` feature) with atomic
//! batch semantics.

mod branch;
pub mod config;
mod error;
mod index;
mod kv_store;
mod output;
#[cfg(feature = "sqlite")]
mod sqlite_store;
mod store;
#[cfg(test)]
pub(crate) mod test_utils;
mod tree;

pub mod builder;

pub use branch::TreeBranch;
pub use builder::CurveTreeBuilder;
pub use error::CurveTreeError;
pub use index::{TREE_NODE_SIZE, TreeIndex, TreeNode};
pub use kv_store::{BatchOp, KvStore, KvTreeStore, MemKvStore};
pub use output::{OUTPUT_TUPLE_SIZE, OutputTuple};
#[cfg(feature = "sqlite")]
pub use sqlite_store::SqliteKvStore;
pub use store::{MemTreeStore, TreeStore};
pub use tree::CurveTree;
