//! Safe prover/verifier bridge over the C ABI.
//!
//! The bridge does no cryptography of its own: it frames tree data into
//! the engine's fixed layouts, sizes buffers, and translates status codes
//! into typed errors.

use curvetree::{CurveTree, OutputTuple, TreeBranch};
use curvetree_pedersen::EdwardsPoint;

use crate::error::FcmpError;
use crate::ffi::{
    self, FCMP_ERROR_PROOF_VERIFICATION, FCMP_SUCCESS, FcmpBranch, FcmpBranchLayer, FcmpInput,
    SCALAR_SIZE,
};

/// Upper bound on the serialized proof size for the given shape.
pub fn proof_size(num_inputs: u32, num_layers: u32) -> usize {
    ffi::fcmp_proof_size(num_inputs, num_layers)
}

/// Generates membership proofs for leaves of one tree.
pub struct Prover<'a> {
    tree: &'a CurveTree,
}

impl<'a> Prover<'a> {
    pub fn new(tree: &'a CurveTree) -> Self {
        Self { tree }
    }

    /// Prove membership of the output at `leaf_index`.
    ///
    /// Extracts the branch and root from the tree, marshals them into the
    /// engine's layout, and returns the proof bytes resized to the length
    /// the engine reported.
    pub fn prove(&self, leaf_index: u64) -> Result<Vec<u8>, FcmpError> {
        let output = self
            .tree
            .get_output(leaf_index)?
            .ok_or(FcmpError::UnknownLeaf(leaf_index))?;
        let branch = self
            .tree
            .get_branch(leaf_index)?
            .ok_or(FcmpError::UnknownLeaf(leaf_index))?;
        let root = self.tree.get_root()?;
        prove_with_branch(&root, &output, &branch)
    }
}

/// Prove membership from an already-extracted branch.
pub fn prove_with_branch(
    root: &EdwardsPoint,
    output: &OutputTuple,
    branch: &TreeBranch,
) -> Result<Vec<u8>, FcmpError> {
    // Flatten each layer into a contiguous scalar array; the descriptor
    // structs borrow these buffers for the duration of the call.
    let layer_bytes: Vec<Vec<u8>> = branch
        .layers
        .iter()
        .map(|layer| {
            let mut bytes = Vec::with_capacity(layer.len() * SCALAR_SIZE);
            for scalar in layer {
                bytes.extend_from_slice(scalar.as_bytes());
            }
            bytes
        })
        .collect();
    let layer_descriptors: Vec<FcmpBranchLayer> = layer_bytes
        .iter()
        .map(|bytes| FcmpBranchLayer {
            num_elements: (bytes.len() / SCALAR_SIZE) as u32,
            elements: bytes.as_ptr(),
        })
        .collect();
    let ffi_branch = FcmpBranch {
        leaf_index: branch.leaf_index,
        num_layers: layer_descriptors.len() as u32,
        layers: layer_descriptors.as_ptr(),
    };

    let max_len = proof_size(1, branch.depth());
    if max_len == 0 {
        return Err(FcmpError::engine(ffi::FCMP_ERROR_INVALID_PARAM));
    }

    let root_bytes = root.compress().to_bytes();
    let output_bytes = output.to_bytes();
    let mut proof = vec![0u8; max_len];
    let mut actual_len = 0usize;

    let status = unsafe {
        ffi::fcmp_prove(
            proof.as_mut_ptr(),
            &mut actual_len,
            max_len,
            root_bytes.as_ptr(),
            output_bytes.as_ptr(),
            &ffi_branch,
        )
    };
    if status != FCMP_SUCCESS {
        return Err(FcmpError::engine(status));
    }
    proof.truncate(actual_len);
    Ok(proof)
}

/// Verifies membership proofs against a tree root.
///
/// The root is updatable so one verifier can follow a growing tree.
pub struct Verifier {
    root: [u8; 32],
}

impl Verifier {
    pub fn new(root: &EdwardsPoint) -> Self {
        Self {
            root: root.compress().to_bytes(),
        }
    }

    pub fn set_root(&mut self, root: &EdwardsPoint) {
        self.root = root.compress().to_bytes();
    }

    /// Check a proof against the current root.
    ///
    /// Returns `Ok(false)` when the engine rejects the proof; any other
    /// non-success status becomes a typed error.
    pub fn verify(&self, input: &FcmpInput, proof: &[u8]) -> Result<bool, FcmpError> {
        let status = unsafe {
            ffi::fcmp_verify(self.root.as_ptr(), input, proof.as_ptr(), proof.len())
        };
        match status {
            FCMP_SUCCESS => Ok(true),
            FCMP_ERROR_PROOF_VERIFICATION => Ok(false),
            code => Err(FcmpError::engine(code)),
        }
    }
}

#[cfg(test)]
mod tests {
    use curvetree_pedersen::hash_to_point;

    use super::*;

    fn sample_output(index: u64) -> OutputTuple {
        let point = |tag: u64| {
            let mut data = b"fcmp bridge test point ".to_vec();
            data.extend_from_slice(&tag.to_le_bytes());
            hash_to_point(&data)
        };
        OutputTuple::from_points(point(index * 3), point(index * 3 + 1), point(index * 3 + 2))
    }

    fn sample_tree(count: u64) -> (CurveTree, Vec<OutputTuple>) {
        let outputs: Vec<OutputTuple> = (0..count).map(sample_output).collect();
        let mut tree = CurveTree::in_memory();
        tree.add_outputs(&outputs).unwrap();
        (tree, outputs)
    }

    #[test]
    fn prove_and_verify_round_trip() {
        let (tree, _outputs) = sample_tree(45);
        let prover = Prover::new(&tree);

        let proof = prover.prove(3).unwrap();
        assert!(!proof.is_empty());
        assert!(proof.len() <= proof_size(1, tree.depth()));

        let root = tree.get_root().unwrap();
        let verifier = Verifier::new(&root);
        assert!(verifier.verify(&FcmpInput::default(), &proof).unwrap());
    }

    #[test]
    fn proofs_are_deterministic_per_leaf() {
        let (tree, _outputs) = sample_tree(10);
        let prover = Prover::new(&tree);
        assert_eq!(prover.prove(2).unwrap(), prover.prove(2).unwrap());
        assert_ne!(prover.prove(2).unwrap(), prover.prove(3).unwrap());
    }

    #[test]
    fn unknown_leaf_is_an_error() {
        let (tree, _outputs) = sample_tree(4);
        let prover = Prover::new(&tree);
        assert!(matches!(prover.prove(4), Err(FcmpError::UnknownLeaf(4))));
    }

    #[test]
    fn zeroed_proof_is_rejected() {
        let (tree, _outputs) = sample_tree(4);
        let root = tree.get_root().unwrap();
        let verifier = Verifier::new(&root);

        let zeroed = vec![0u8; 64];
        assert!(!verifier.verify(&FcmpInput::default(), &zeroed).unwrap());
    }

    #[test]
    fn short_proof_is_a_typed_error() {
        let (tree, _outputs) = sample_tree(4);
        let root = tree.get_root().unwrap();
        let verifier = Verifier::new(&root);

        let short = vec![1u8; 16];
        assert!(matches!(
            verifier.verify(&FcmpInput::default(), &short),
            Err(FcmpError::Engine { code, .. }) if code == ffi::FCMP_ERROR_INVALID_PARAM
        ));
    }

    #[test]
    fn verifier_root_can_be_updated() {
        let (mut tree, _outputs) = sample_tree(5);
        let prover_proof = Prover::new(&tree).prove(0).unwrap();
        let mut verifier = Verifier::new(&tree.get_root().unwrap());
        assert!(verifier.verify(&FcmpInput::default(), &prover_proof).unwrap());

        tree.add_output(&sample_output(100)).unwrap();
        verifier.set_root(&tree.get_root().unwrap());
        // The placeholder engine does not bind proofs to the root, but the
        // refreshed verifier must still accept a freshly generated proof.
        let proof = Prover::new(&tree).prove(5).unwrap();
        assert!(verifier.verify(&FcmpInput::default(), &proof).unwrap());
    }

    #[test]
    fn prove_with_branch_matches_prover() {
        let (tree, outputs) = sample_tree(6);
        let root = tree.get_root().unwrap();
        let branch = tree.get_branch(1).unwrap().unwrap();

        let direct = prove_with_branch(&root, &outputs[1], &branch).unwrap();
        let via_prover = Prover::new(&tree).prove(1).unwrap();
        assert_eq!(direct, via_prover);
    }
}
