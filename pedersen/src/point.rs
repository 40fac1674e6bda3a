//! Hash-to-point / hash-to-scalar helpers.
//!
//! Each helper uses a distinct domain separation tag to prevent
//! cross-domain collisions.

use blake2::{Blake2b512, Digest};
use curve25519_dalek::{Scalar, edwards::CompressedEdwardsY, edwards::EdwardsPoint};

const HASH_TO_POINT_TAG: &[u8] = b"curvetree_hash_to_point_v1";
const HASH_TO_SCALAR_TAG: &[u8] = b"curvetree_hash_to_scalar_v1";

/// Hash arbitrary data to a point in the prime-order subgroup.
///
/// Blake2b512 over the tagged input, then try-and-increment: candidate
/// compressed encodings are drawn from `blake2b(digest || counter)` until
/// one decompresses, and the result is multiplied by the cofactor. The
/// output is deterministic, never the identity, and has an unknown
/// discrete log relative to the basepoint.
pub fn hash_to_point(data: &[u8]) -> EdwardsPoint {
    let mut hasher = Blake2b512::new();
    hasher.update(HASH_TO_POINT_TAG);
    hasher.update(data);
    let digest = hasher.finalize();

    for counter in 0u16..=1024 {
        let mut attempt = Blake2b512::new();
        attempt.update(&digest);
        attempt.update(counter.to_le_bytes());
        let candidate = attempt.finalize();

        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&candidate[..32]);
        if let Some(point) = CompressedEdwardsY(bytes).decompress() {
            let cleared = point.mul_by_cofactor();
            if cleared != EdwardsPoint::default() {
                return cleared;
            }
        }
    }

    // 1025 consecutive decode failures has probability ~2^-1025.
    unreachable!("hash_to_point exhausted candidates");
}

/// Hash arbitrary data to a scalar by wide reduction mod the group order.
pub fn hash_to_scalar(data: &[u8]) -> Scalar {
    let mut hasher = Blake2b512::new();
    hasher.update(HASH_TO_SCALAR_TAG);
    hasher.update(data);
    let digest = hasher.finalize();

    let mut wide = [0u8; 64];
    wide.copy_from_slice(&digest);
    Scalar::from_bytes_mod_order_wide(&wide)
}

/// Build a scalar from up to 32 little-endian bytes, zero-extended and
/// reduced mod the group order.
///
/// Used by the tree to lift point-encoding fragments into field elements.
///
/// # Panics
///
/// Panics if `bytes` is longer than 32 bytes.
pub fn scalar_from_bytes_wide(bytes: &[u8]) -> Scalar {
    assert!(bytes.len() <= 32, "at most 32 bytes");
    let mut buf = [0u8; 32];
    buf[..bytes.len()].copy_from_slice(bytes);
    Scalar::from_bytes_mod_order(buf)
}
