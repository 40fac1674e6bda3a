//! Errors surfaced by the prover/verifier bridge.

use curvetree::CurveTreeError;

use crate::ffi;

/// Errors from proof generation and verification.
#[derive(Debug, thiserror::Error)]
pub enum FcmpError {
    /// The proving engine returned a non-success status code.
    #[error("proving engine error {code}: {message}")]
    Engine { code: i32, message: String },

    /// The tree could not supply the data needed for the proof.
    #[error(transparent)]
    Tree(#[from] CurveTreeError),

    /// No output exists at the requested leaf index.
    #[error("no output at leaf index {0}")]
    UnknownLeaf(u64),
}

impl FcmpError {
    /// Build the typed error for an engine status code, attaching the
    /// engine's own message string.
    pub fn engine(code: i32) -> Self {
        FcmpError::Engine {
            code,
            message: ffi::error_cstr(code).to_string_lossy().into_owned(),
        }
    }
}
