//! Ed25519 Pedersen hash primitive for curve trees.
//!
//! The tree hashes vectors of scalars to curve points:
//!
//! `H(x1, .., xn) = H_init + x1*G1 + .. + xn*Gn`
//!
//! where `H_init` is a fixed initialization point (so the empty input does
//! not hash to the identity) and the `G_i` are nothing-up-my-sleeve
//! generators derived from a seed string by hash-to-point.
//!
//! The hash is collision resistant under the discrete log assumption and
//! additively homomorphic, which is what the membership-proof circuit
//! consumes.

pub(crate) mod generators;
mod hash;
pub(crate) mod point;

pub use curve25519_dalek::{
    Scalar,
    edwards::{CompressedEdwardsY, EdwardsPoint},
};
pub use generators::Generators;
pub use hash::PedersenHash;
pub use point::{hash_to_point, hash_to_scalar, scalar_from_bytes_wide};

/// Size of a serialized scalar in bytes.
pub const SCALAR_SIZE: usize = 32;
/// Size of a compressed point in bytes.
pub const POINT_SIZE: usize = 32;
