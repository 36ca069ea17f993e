//! Deduplicating, content-addressed blob storage.
//!
//! Content is written through a [`WriteSession`] to a private temporary sink
//! and digested on the fly. When the session is closed, the
//! [`FinalizationCoordinator`] derives the blob's locator from the digest and
//! either reuses an identical blob that is already stored or materializes a
//! new one. Identical content is therefore stored exactly once, whoever
//! writes it and however often.
//!
//! # Layout
//!
//! A blob with hex digest `d` lives at `<root>/d[0..2]/d[2..4]/d[4..6]/d.bin`
//! and is addressed by the locator `<scheme>://d[0..2]/d[2..4]/d[4..6]/d.bin`.
//!
//! # Transactions
//!
//! Every finalize runs against a [`TransactionContext`]. A blob a write
//! actually created is registered in the transaction's
//! [`PendingDeletionSet`] and deleted if the transaction rolls back; reused
//! blobs are never registered.
//!
//! # Design Rules
//!
//! 1. A blob is immutable once it is in place.
//! 2. Write-then-publish: the locator is only reported after the blob exists.
//! 3. Blobs appear atomically; readers never see a partial blob.
//! 4. Replacing content never deletes the previous blob.
//! 5. Rollback deletes only what the rolled-back transaction created.

pub mod config;
pub mod error;
pub mod finalize;
pub mod reader;
pub mod session;
pub mod store;
pub mod txn;

// Re-export primary types at crate root for ergonomic imports.
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use finalize::{FinalizationCoordinator, FinalizedContent, Materialization};
pub use reader::ContentReader;
pub use session::WriteSession;
pub use store::ContentAddressStore;
pub use txn::{
    PendingDeletionSet, RollbackReport, Transaction, TransactionContext, PENDING_DELETIONS_KEY,
};
