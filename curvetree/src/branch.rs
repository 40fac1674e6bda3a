//! Membership branches extracted from the tree.

use curvetree_pedersen::{SCALAR_SIZE, Scalar};

use crate::config::MAX_DEPTH;

/// The sibling data proving one leaf's membership.
///
/// Layer 0 holds the field elements of every output in the leaf's own
/// commitment group; each later layer holds the scalar-truncated hashes of
/// the corresponding ancestor's children, ending one level below the root.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TreeBranch {
    pub leaf_index: u64,
    pub layers: Vec<Vec<Scalar>>,
}

impl TreeBranch {
    /// Number of layers, which equals the tree depth at extraction time.
    pub fn depth(&self) -> u32 {
        self.layers.len() as u32
    }

    /// Wire form: `leaf_index` (8 bytes LE), `num_layers` (4 bytes LE),
    /// then per layer `num_elements` (4 bytes LE) and that many 32-byte
    /// scalars.
    pub fn to_bytes(&self) -> Vec<u8> {
        let elements: usize = self.layers.iter().map(Vec::len).sum();
        let mut bytes = Vec::with_capacity(12 + self.layers.len() * 4 + elements * SCALAR_SIZE);
        bytes.extend_from_slice(&self.leaf_index.to_le_bytes());
        bytes.extend_from_slice(&(self.layers.len() as u32).to_le_bytes());
        for layer in &self.layers {
            bytes.extend_from_slice(&(layer.len() as u32).to_le_bytes());
            for scalar in layer {
                bytes.extend_from_slice(scalar.as_bytes());
            }
        }
        bytes
    }

    /// Decode the wire form. Returns `None` on truncation, trailing bytes,
    /// or a layer count above the depth cap.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 12 {
            return None;
        }
        let leaf_index = u64::from_le_bytes(bytes[..8].try_into().ok()?);
        let num_layers = u32::from_le_bytes(bytes[8..12].try_into().ok()?);
        if num_layers > MAX_DEPTH {
            return None;
        }

        let mut offset = 12;
        let mut layers = Vec::with_capacity(num_layers as usize);
        for _ in 0..num_layers {
            if offset + 4 > bytes.len() {
                return None;
            }
            let num_elements =
                u32::from_le_bytes(bytes[offset..offset + 4].try_into().ok()?) as usize;
            offset += 4;

            let layer_len = num_elements.checked_mul(SCALAR_SIZE)?;
            if offset + layer_len > bytes.len() {
                return None;
            }
            let mut layer = Vec::with_capacity(num_elements);
            for _ in 0..num_elements {
                let mut scalar_bytes = [0u8; SCALAR_SIZE];
                scalar_bytes.copy_from_slice(&bytes[offset..offset + SCALAR_SIZE]);
                layer.push(Scalar::from_bytes_mod_order(scalar_bytes));
                offset += SCALAR_SIZE;
            }
            layers.push(layer);
        }

        if offset != bytes.len() {
            return None;
        }
        Some(Self { leaf_index, layers })
    }
}
