use curve25519_dalek::{Scalar, edwards::EdwardsPoint, traits::MultiscalarMul};

use crate::generators::Generators;
use crate::point::hash_to_point;

/// Pedersen hash of a scalar vector: `init + sum(x_i * G_i)`.
///
/// The initializer and all generators are derived from the seed, so two
/// hashers built from the same seed produce identical digests. Hashing the
/// empty vector yields the initializer itself.
pub struct PedersenHash {
    init: EdwardsPoint,
    generators: Generators,
}

impl PedersenHash {
    pub fn new(seed: &[u8]) -> Self {
        let mut init_data = seed.to_vec();
        init_data.extend_from_slice(b"I");
        Self {
            init: hash_to_point(&init_data),
            generators: Generators::new(seed),
        }
    }

    /// The hash of the empty vector.
    pub fn init(&self) -> EdwardsPoint {
        self.init
    }

    pub fn hash(&self, inputs: &[Scalar]) -> EdwardsPoint {
        if inputs.is_empty() {
            return self.init;
        }
        let generators = self.generators.take(inputs.len());
        self.init + EdwardsPoint::multiscalar_mul(inputs.iter(), generators.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_init() {
        let hasher = PedersenHash::new(b"test seed");
        assert_eq!(hasher.hash(&[]), hasher.init());
    }

    #[test]
    fn deterministic_across_instances() {
        let a = PedersenHash::new(b"test seed");
        let b = PedersenHash::new(b"test seed");
        let inputs: Vec<Scalar> = (1u64..40).map(Scalar::from).collect();
        assert_eq!(a.hash(&inputs), b.hash(&inputs));
    }

    #[test]
    fn sensitive_to_every_input() {
        let hasher = PedersenHash::new(b"test seed");
        let inputs: Vec<Scalar> = (1u64..10).map(Scalar::from).collect();
        let base = hasher.hash(&inputs);
        for i in 0..inputs.len() {
            let mut changed = inputs.clone();
            changed[i] += Scalar::ONE;
            assert_ne!(hasher.hash(&changed), base, "input {i} did not matter");
        }
    }

    #[test]
    fn seed_separates_hashers() {
        let a = PedersenHash::new(b"seed a");
        let b = PedersenHash::new(b"seed b");
        let inputs = [Scalar::from(7u64)];
        assert_ne!(a.hash(&inputs), b.hash(&inputs));
    }

    #[test]
    fn homomorphic_in_single_input() {
        // hash([2]) - init == 2 * (hash([1]) - init)
        let hasher = PedersenHash::new(b"test seed");
        let one = hasher.hash(&[Scalar::ONE]) - hasher.init();
        let two = hasher.hash(&[Scalar::from(2u64)]) - hasher.init();
        assert_eq!(two, one + one);
    }
}
