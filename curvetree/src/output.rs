//! The atomic record stored in the tree.

use curve25519_dalek::traits::IsIdentity;
use curvetree_pedersen::{CompressedEdwardsY, EdwardsPoint, Scalar, scalar_from_bytes_wide};

use crate::config::ELEMENTS_PER_OUTPUT;

/// Serialized size of an [`OutputTuple`]: three 32-byte compressed points.
pub const OUTPUT_TUPLE_SIZE: usize = 96;

/// One shielded output: a one-time public key `O`, a key image `I`, and an
/// amount commitment `C`.
///
/// An output is handed to the tree once at insertion and never mutated. All
/// three points must decompress to valid non-identity curve points; tuples
/// failing that check are rejected before any state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputTuple {
    pub one_time_key: CompressedEdwardsY,
    pub key_image: CompressedEdwardsY,
    pub commitment: CompressedEdwardsY,
}

impl OutputTuple {
    pub fn new(
        one_time_key: CompressedEdwardsY,
        key_image: CompressedEdwardsY,
        commitment: CompressedEdwardsY,
    ) -> Self {
        Self {
            one_time_key,
            key_image,
            commitment,
        }
    }

    pub fn from_points(
        one_time_key: EdwardsPoint,
        key_image: EdwardsPoint,
        commitment: EdwardsPoint,
    ) -> Self {
        Self {
            one_time_key: one_time_key.compress(),
            key_image: key_image.compress(),
            commitment: commitment.compress(),
        }
    }

    /// All three points decompress and none is the identity.
    pub fn is_valid(&self) -> bool {
        [&self.one_time_key, &self.key_image, &self.commitment]
            .iter()
            .all(|point| matches!(point.decompress(), Some(p) if !p.is_identity()))
    }

    /// The six field elements this output contributes to its leaf commitment.
    ///
    /// Each point yields two scalars built from the halves of its compressed
    /// encoding. This stands in for true coordinate decomposition until the
    /// proving engine's extraction convention is wired in; changing it changes
    /// every leaf commitment, so it must move in lockstep with the circuit.
    pub fn to_field_elements(&self) -> [Scalar; ELEMENTS_PER_OUTPUT] {
        let halves = |point: &CompressedEdwardsY| {
            let bytes = point.as_bytes();
            (
                scalar_from_bytes_wide(&bytes[..16]),
                scalar_from_bytes_wide(&bytes[16..]),
            )
        };
        let (o_lo, o_hi) = halves(&self.one_time_key);
        let (i_lo, i_hi) = halves(&self.key_image);
        let (c_lo, c_hi) = halves(&self.commitment);
        [o_lo, o_hi, i_lo, i_hi, c_lo, c_hi]
    }

    /// Fixed 96-byte wire form: `O ‖ I ‖ C`.
    pub fn to_bytes(&self) -> [u8; OUTPUT_TUPLE_SIZE] {
        let mut bytes = [0u8; OUTPUT_TUPLE_SIZE];
        bytes[..32].copy_from_slice(self.one_time_key.as_bytes());
        bytes[32..64].copy_from_slice(self.key_image.as_bytes());
        bytes[64..].copy_from_slice(self.commitment.as_bytes());
        bytes
    }

    /// Decode the 96-byte wire form. Returns `None` on a length mismatch or
    /// if the decoded tuple fails validation.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != OUTPUT_TUPLE_SIZE {
            return None;
        }
        let point = |range: std::ops::Range<usize>| {
            let mut buf = [0u8; 32];
            buf.copy_from_slice(&bytes[range]);
            CompressedEdwardsY(buf)
        };
        let output = Self {
            one_time_key: point(0..32),
            key_image: point(32..64),
            commitment: point(64..96),
        };
        output.is_valid().then_some(output)
    }
}
