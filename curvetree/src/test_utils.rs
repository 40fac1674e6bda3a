//! Test utilities: deterministic outputs for curve tree tests.

use curvetree_pedersen::{EdwardsPoint, hash_to_point};

use crate::output::OutputTuple;

/// A deterministic valid curve point derived from a tag.
pub(crate) fn sample_point(tag: u64) -> EdwardsPoint {
    let mut data = b"curvetree test point ".to_vec();
    data.extend_from_slice(&tag.to_le_bytes());
    hash_to_point(&data)
}

/// A deterministic valid output tuple derived from an index.
pub(crate) fn sample_output(index: u64) -> OutputTuple {
    OutputTuple::from_points(
        sample_point(index * 3),
        sample_point(index * 3 + 1),
        sample_point(index * 3 + 2),
    )
}

/// The first `count` sample outputs.
pub(crate) fn sample_outputs(count: u64) -> Vec<OutputTuple> {
    (0..count).map(sample_output).collect()
}
