//! Deterministic generator derivation.

use std::sync::RwLock;

use curve25519_dalek::edwards::EdwardsPoint;

use crate::point::hash_to_point;

/// Number of generators derived eagerly at construction.
const INITIAL_GENERATORS: usize = 64;

/// A lazily growing set of independent generators derived from a seed.
///
/// Generator `i` is `hash_to_point(seed || "G" || i_le)`, so two sets built
/// from the same seed always agree, and no generator has a known discrete
/// log relative to any other.
pub struct Generators {
    seed: Vec<u8>,
    g_bold: RwLock<Vec<EdwardsPoint>>,
}

impl Generators {
    pub fn new(seed: &[u8]) -> Self {
        let generators = Self {
            seed: seed.to_vec(),
            g_bold: RwLock::new(Vec::new()),
        };
        generators.ensure(INITIAL_GENERATORS);
        generators
    }

    fn derive(&self, index: usize) -> EdwardsPoint {
        let mut data = self.seed.clone();
        data.extend_from_slice(b"G");
        data.extend_from_slice(&(index as u64).to_le_bytes());
        hash_to_point(&data)
    }

    /// Grow the set to at least `count` generators.
    pub fn ensure(&self, count: usize) {
        {
            let read = self.g_bold.read().expect("generator lock poisoned");
            if read.len() >= count {
                return;
            }
        }
        let mut write = self.g_bold.write().expect("generator lock poisoned");
        while write.len() < count {
            let next = self.derive(write.len());
            write.push(next);
        }
    }

    /// Copy of the first `count` generators, growing the set if needed.
    pub fn take(&self, count: usize) -> Vec<EdwardsPoint> {
        self.ensure(count);
        let read = self.g_bold.read().expect("generator lock poisoned");
        read[..count].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_generators() {
        let a = Generators::new(b"seed");
        let b = Generators::new(b"seed");
        assert_eq!(a.take(16), b.take(16));
    }

    #[test]
    fn generators_are_distinct() {
        let generators = Generators::new(b"seed");
        let points = generators.take(64);
        for i in 0..points.len() {
            for j in (i + 1)..points.len() {
                assert_ne!(points[i], points[j], "generators {i} and {j} collide");
            }
        }
    }

    #[test]
    fn ensure_grows_past_initial() {
        let generators = Generators::new(b"seed");
        generators.ensure(300);
        let grown = generators.take(300);
        assert_eq!(grown.len(), 300);
        // Growth must not disturb existing generators.
        let before = Generators::new(b"seed").take(64);
        assert_eq!(grown[..64], before[..]);
    }
}
