//! Streaming digest primitives for the deduplicating content store.
//!
//! Provides a single [`Digester`] over every [`DigestAlgorithm`] the store
//! understands, and a [`DigestingWriter`] that folds bytes into a digest while
//! writing them through to a sink, so content never has to be read twice.
//!
//! All crypto operations wrap established libraries -- no custom cryptography.
//!
//! [`DigestAlgorithm`]: dedup_types::DigestAlgorithm

pub mod hasher;
pub mod writer;

pub use hasher::{digest_bytes, digest_reader, Digester};
pub use writer::DigestingWriter;
