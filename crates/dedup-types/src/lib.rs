//! Foundation types for the deduplicating content store.
//!
//! This crate provides the identifiers and value types shared by the store,
//! the fingerprint catalog and the command-line tool. Every other crate in the
//! workspace depends on `dedup-types`.
//!
//! # Key Types
//!
//! - [`ContentLocator`] -- Opaque `<scheme>://<relative-path>` address of a blob
//! - [`DigestAlgorithm`] -- Cryptographic hash used for addressing or fingerprinting
//! - [`NodeRef`] / [`StoreRef`] -- Host node identity and the store it lives in
//! - [`PropertyName`] -- Qualified name of a node property
//! - [`ContentData`] -- `(locator, mimetype, encoding, size)` handed back to the host

pub mod content;
pub mod digest;
pub mod error;
pub mod locator;
pub mod node;

pub use content::ContentData;
pub use digest::DigestAlgorithm;
pub use error::TypeError;
pub use locator::ContentLocator;
pub use node::{NodeRef, PropertyName, StoreRef};
