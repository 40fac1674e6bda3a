//! Tree geometry constants and the shared tree hasher.

use std::sync::OnceLock;

use curvetree_pedersen::PedersenHash;

/// Field elements contributed by one output tuple (two per point).
pub const ELEMENTS_PER_OUTPUT: usize = 6;

/// Outputs folded into one leaf commitment.
pub const LEAF_BRANCH_WIDTH: u64 = 38;

/// Field elements in a full leaf-commitment group.
pub const LEAF_LAYER_WIDTH: usize = LEAF_BRANCH_WIDTH as usize * ELEMENTS_PER_OUTPUT;

/// Children folded into one internal node.
pub const INTERNAL_BRANCH_WIDTH: u64 = 38;

/// Hard cap on tree depth; also bounds branch deserialization.
pub const MAX_DEPTH: u32 = 32;

/// Seed every tree hasher is derived from. Trees built with different seeds
/// produce incompatible roots and branches.
pub const TREE_HASH_SEED: &[u8] = b"curvetree_pedersen_v1";

/// Process-wide hasher shared by all trees and by branch verification.
pub fn tree_hasher() -> &'static PedersenHash {
    static HASHER: OnceLock<PedersenHash> = OnceLock::new();
    HASHER.get_or_init(|| PedersenHash::new(TREE_HASH_SEED))
}
