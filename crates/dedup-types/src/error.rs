use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid content locator {locator:?}: {reason}")]
    InvalidLocator { locator: String, reason: String },

    #[error("unsupported digest algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("invalid node reference {0:?}")]
    InvalidNodeRef(String),

    #[error("invalid property name {name:?}: {reason}")]
    InvalidPropertyName { name: String, reason: String },
}
