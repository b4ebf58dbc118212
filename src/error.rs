//! Error type shared by every fallible operation in the crate.

/// Convenience alias used by all fallible APIs.
pub type TransformResult<T> = Result<T, TransformError>;

/// Failures surfaced to the caller of a transform node.
///
/// Degenerate geometry and malformed transform strings are recovered
/// locally and never show up here.
#[derive(thiserror::Error, Debug)]
pub enum TransformError {
    #[error("matrix is not invertible (determinant {determinant})")]
    NonInvertible { determinant: f64 },

    #[error("no input buffer available for processing")]
    MissingInput,

    #[error("unknown pad: {0}")]
    UnknownPad(String),

    #[error("unknown node id: {0}")]
    UnknownNode(usize),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("pixel count mismatch: expected {expected}, got {actual}")]
    BufferSize { expected: usize, actual: usize },

    #[error("configuration parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TransformError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn unknown_pad(pad: impl Into<String>) -> Self {
        Self::UnknownPad(pad.into())
    }
}
