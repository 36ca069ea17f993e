use std::path::PathBuf;

use dedup_types::{ContentLocator, TypeError};

/// Errors from content store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The locator's scheme does not belong to this store. Not retryable.
    #[error("unsupported locator {locator}: this store only serves '{expected}://'")]
    UnsupportedScheme {
        locator: ContentLocator,
        expected: String,
    },

    /// The locator is malformed or points outside the store root.
    #[error("invalid locator {locator:?}: {reason}")]
    InvalidLocator { locator: String, reason: String },

    /// The configured addressing algorithm is not available. Without it no
    /// write can ever be given an address.
    #[error("digest algorithm unavailable for store addressing: {0}")]
    UnsupportedAlgorithm(String),

    /// The digest is too short or not lowercase hex.
    #[error("invalid digest {0:?}")]
    InvalidDigest(String),

    /// The store configuration is unusable.
    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),

    /// Store is configured read-only; the operation is not permitted.
    #[error("operation not permitted: store at {0} is read-only")]
    ReadOnly(PathBuf),

    /// The session was already finalized, or its finalize failed.
    #[error("write session is closed")]
    SessionClosed,

    /// Copying the temporary sink into content-addressed storage failed.
    #[error("failed to materialize {locator}: {source}")]
    Materialize {
        locator: ContentLocator,
        #[source]
        source: std::io::Error,
    },

    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TypeError> for StoreError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidLocator { locator, reason } => Self::InvalidLocator { locator, reason },
            TypeError::UnknownAlgorithm(name) => Self::UnsupportedAlgorithm(name),
            other => Self::InvalidConfig(other.to_string()),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
