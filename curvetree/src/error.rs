//! Errors returned by curve tree operations.

/// Errors that can occur while operating on a curve tree or its storage.
#[derive(Debug, thiserror::Error)]
pub enum CurveTreeError {
    /// An output tuple failed point validation.
    #[error("invalid output: {0}")]
    InvalidOutput(String),

    /// A caller-supplied argument was malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Stored bytes could not be decoded back into their in-memory form.
    #[error("corrupted data: {0}")]
    CorruptedData(String),

    /// The storage backend reported a failure.
    #[error("storage error: {0}")]
    StorageError(String),
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for CurveTreeError {
    fn from(e: rusqlite::Error) -> Self {
        CurveTreeError::StorageError(e.to_string())
    }
}
