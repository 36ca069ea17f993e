use dedup_store::StoreError;
use dedup_types::NodeRef;

/// Errors from the fingerprint catalog.
#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    /// A stored fingerprint string is corrupt or foreign. Never dropped
    /// silently.
    #[error("malformed fingerprint {input:?}: {reason}")]
    Parse { input: String, reason: String },

    /// The node is unknown to the metadata layer.
    #[error("node not found: {0}")]
    NodeNotFound(NodeRef),

    /// The node has no content for the property.
    #[error("node {node} has no content for {property}")]
    NoContent { node: NodeRef, property: String },

    #[error("content store error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for fingerprint operations.
pub type FingerprintResult<T> = Result<T, FingerprintError>;
