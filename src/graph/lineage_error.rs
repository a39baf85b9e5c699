use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building, contracting or writing a lineage graph.
#[derive(Debug, Error)]
pub enum LineageError {
    /// The upstream plans broke a structural contract (missing identity,
    /// reused identity, out-of-range ordinal, cycle). Aborts the render.
    #[error("structural inconsistency: {0}")]
    StructuralInconsistency(String),

    /// An output file is already present and overwrite was not requested.
    #[error("destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    /// The requested image format is outside the supported set.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// The external rendering tool could not be started.
    #[error("external tool unavailable: {0}")]
    ExternalToolUnavailable(String),

    /// The external rendering tool ran and reported a failure.
    #[error("external tool `{tool}` failed with status {status}: {stderr}")]
    ExternalToolFailed {
        tool: String,
        status: i32,
        stderr: String,
    },

    #[error("unknown column `{name}`, expected one of {candidates:?}")]
    UnknownColumn { name: String, candidates: Vec<String> },

    #[error("ambiguous column `{name}` matches ordinals {ordinals:?}")]
    AmbiguousColumn { name: String, ordinals: Vec<usize> },

    #[error("unknown artifact: {0}")]
    UnknownArtifact(String),

    #[error("artifact already registered: {0}")]
    DuplicateArtifact(String),

    /// Names shaped like `<Kind>_<id>` would collide with anonymous labels.
    #[error("artifact name `{0}` collides with generated plan labels")]
    ReservedName(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("format error: {0}")]
    Fmt(#[from] std::fmt::Error),
}

impl LineageError {
    pub fn structural(message: impl Into<String>) -> Self {
        Self::StructuralInconsistency(message.into())
    }

    pub fn err<T>(self) -> Result<T, LineageError> {
        Err(self)
    }
}

/// Result type for lineage operations.
pub type LineageResult<T> = Result<T, LineageError>;
