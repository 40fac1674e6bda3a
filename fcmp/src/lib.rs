//! FCMP proving engine and bridge.
//!
//! This crate has two layers:
//!
//! - [`ffi`]: the C-compatible surface of the proving engine. Scalar and
//!   point primitives, hashing, Pedersen commitments, and the prove/verify
//!   entry points, all over fixed 32-byte buffers and numeric status codes.
//! - [`Prover`]/[`Verifier`]: the safe bridge that frames curve tree
//!   branches into the engine's fixed layouts and translates status codes
//!   into [`FcmpError`].
//!
//! The proof construction is a placeholder transcript hash; the buffer
//! layouts and status codes are the stable contract a real circuit slots
//! into.

pub mod ffi;

mod error;
mod proof;

pub use error::FcmpError;
pub use ffi::FcmpInput;
pub use proof::{Prover, Verifier, proof_size, prove_with_branch};
