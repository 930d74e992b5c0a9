//! Error type shared by the storage layer.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Result type used by document store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from document store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Caller-supplied content hash is not exactly 16 lowercase hex chars.
    InvalidContentHash(String),
    /// Filesystem operation failed on a mutating path.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Mind map could not be serialized.
    Serialize(serde_json::Error),
    /// Update carried nodes owned by another document.
    DocumentMismatch { expected: String, actual: String },
    /// Save named a root node id absent from the node list.
    RootNotFound(String),
    /// Blocking task was cancelled or panicked.
    TaskJoin(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            // Debug formatting escapes control bytes such as NUL.
            Self::InvalidContentHash(value) => write!(f, "invalid content hash format: {value:?}"),
            Self::Io { path, source } => write!(f, "i/o error at `{}`: {source}", path.display()),
            Self::Serialize(err) => write!(f, "failed to serialize mind map: {err}"),
            Self::DocumentMismatch { expected, actual } => write!(
                f,
                "node belongs to document {actual}, expected {expected}"
            ),
            Self::RootNotFound(root_id) => write!(f, "root node {root_id} is not among saved nodes"),
            Self::TaskJoin(message) => write!(f, "blocking storage task failed: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Serialize(err) => Some(err),
            Self::InvalidContentHash(_) => None,
            Self::DocumentMismatch { .. } => None,
            Self::RootNotFound(_) => None,
            Self::TaskJoin(_) => None,
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}
