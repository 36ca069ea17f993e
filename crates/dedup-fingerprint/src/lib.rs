//! Content fingerprints for host nodes.
//!
//! The [`FingerprintCatalog`] keeps, per node and per content property, one
//! [`FingerprintRecord`] for each configured digest algorithm. It is driven
//! by the host's content-property update notification and reads and writes
//! node data only through the [`NodeMetadata`] and [`ContentSource`] traits.
//!
//! # Encoding
//!
//! Records are stored as strings of the form
//! `<property>|<algorithm>|<hex digest>`. Decoding anything that does not
//! split into exactly three fields is a [`FingerprintError::Parse`].
//!
//! # Backends
//!
//! - [`InMemoryNodeStore`] -- `HashMap`-based node registry for tests and embedding
//! - [`StoreContentSource`] -- reads node content from a `ContentAddressStore`

pub mod catalog;
pub mod config;
pub mod error;
pub mod memory;
pub mod record;
pub mod set;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use catalog::{CatalogOutcome, FingerprintCatalog};
pub use config::{FingerprintAlgorithms, FingerprintConfig};
pub use error::{FingerprintError, FingerprintResult};
pub use memory::{InMemoryNodeStore, StoreContentSource};
pub use record::FingerprintRecord;
pub use set::FingerprintSet;
pub use traits::{ContentPropertyUpdate, ContentSource, NodeMetadata};
