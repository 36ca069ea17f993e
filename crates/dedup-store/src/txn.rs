//! Transaction-scoped bookkeeping of blobs created by the current unit of work.
//!
//! A write that materializes a new blob registers its locator in the
//! transaction's [`PendingDeletionSet`]. Rolling the transaction back deletes
//! every registered blob; committing forgets them. Blobs that were reused
//! through deduplication are never registered, so a rollback cannot delete
//! content another writer created.

use std::collections::BTreeSet;
use std::fmt;

use dedup_types::ContentLocator;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::store::ContentAddressStore;

/// Key under which hosts that keep per-transaction resources in a keyed map
/// should store the pending-deletion set.
pub const PENDING_DELETIONS_KEY: &str = "dedup.store.post-rollback-deletions";

/// Locators to delete if the owning transaction rolls back.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingDeletionSet {
    locators: BTreeSet<ContentLocator>,
}

impl PendingDeletionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a locator. Returns `false` if it was already registered.
    pub fn register(&mut self, locator: ContentLocator) -> bool {
        self.locators.insert(locator)
    }

    /// Remove a locator. Returns `false` if it was not registered.
    pub fn unregister(&mut self, locator: &ContentLocator) -> bool {
        self.locators.remove(locator)
    }

    pub fn contains(&self, locator: &ContentLocator) -> bool {
        self.locators.contains(locator)
    }

    pub fn len(&self) -> usize {
        self.locators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContentLocator> {
        self.locators.iter()
    }

    /// Delete every registered blob from `store`, emptying the set.
    ///
    /// Failures are collected in the report rather than aborting the sweep;
    /// one undeletable blob must not keep the rest alive.
    pub fn sweep(&mut self, store: &ContentAddressStore) -> RollbackReport {
        let mut report = RollbackReport::default();
        for locator in std::mem::take(&mut self.locators) {
            match store.delete(&locator) {
                Ok(true) => report.deleted.push(locator),
                Ok(false) => report.already_absent.push(locator),
                Err(err) => {
                    warn!(%locator, error = %err, "failed to delete blob during rollback");
                    report.failed.push((locator, err.to_string()));
                }
            }
        }
        report
    }
}

/// Access to the pending-deletion set of the transaction a write belongs to.
///
/// The set is created lazily on first access and lives exactly as long as the
/// transaction. The context is passed explicitly to every finalize, so there
/// is no ambient "current transaction".
pub trait TransactionContext {
    /// Get the current transaction's set, creating it if needed.
    fn pending_deletions(&mut self) -> &mut PendingDeletionSet;
}

impl TransactionContext for PendingDeletionSet {
    fn pending_deletions(&mut self) -> &mut PendingDeletionSet {
        self
    }
}

/// What a rollback did with each registered locator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RollbackReport {
    /// Blobs removed from the store.
    pub deleted: Vec<ContentLocator>,
    /// Locators whose blob was already gone.
    pub already_absent: Vec<ContentLocator>,
    /// Locators that could not be deleted, with the error message.
    pub failed: Vec<(ContentLocator, String)>,
}

impl RollbackReport {
    /// Returns `true` if every registered blob is gone.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A minimal unit of work that owns a pending-deletion set.
///
/// Hosts with their own transaction machinery implement
/// [`TransactionContext`] directly; `Transaction` is the standalone version
/// used by the command-line tool and tests.
pub struct Transaction {
    id: Uuid,
    pending: Option<PendingDeletionSet>,
}

impl Transaction {
    /// Begin a new transaction with a time-ordered id.
    pub fn begin() -> Self {
        let id = Uuid::now_v7();
        debug!(txn = %id, "transaction started");
        Self { id, pending: None }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The pending-deletion set, if any write has touched it yet.
    pub fn pending(&self) -> Option<&PendingDeletionSet> {
        self.pending.as_ref()
    }

    /// Commit: every blob this transaction created is kept.
    pub fn commit(self) {
        let kept = self.pending.as_ref().map_or(0, PendingDeletionSet::len);
        debug!(txn = %self.id, kept, "transaction committed");
    }

    /// Roll back: delete every blob this transaction created.
    pub fn rollback(self, store: &ContentAddressStore) -> RollbackReport {
        let report = match self.pending {
            Some(mut set) => set.sweep(store),
            None => RollbackReport::default(),
        };
        info!(
            txn = %self.id,
            deleted = report.deleted.len(),
            already_absent = report.already_absent.len(),
            failed = report.failed.len(),
            "transaction rolled back"
        );
        report
    }
}

impl TransactionContext for Transaction {
    fn pending_deletions(&mut self) -> &mut PendingDeletionSet {
        self.pending.get_or_insert_with(PendingDeletionSet::new)
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("pending", &self.pending.as_ref().map(PendingDeletionSet::len))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use std::io::Write;

    fn loc(s: &str) -> ContentLocator {
        ContentLocator::parse(s).unwrap()
    }

    // -----------------------------------------------------------------------
    // PendingDeletionSet
    // -----------------------------------------------------------------------

    #[test]
    fn register_and_unregister() {
        let mut set = PendingDeletionSet::new();
        assert!(set.is_empty());
        assert!(set.register(loc("store://aa/bb/cc/one.bin")));
        assert!(!set.register(loc("store://aa/bb/cc/one.bin")));
        assert_eq!(set.len(), 1);
        assert!(set.contains(&loc("store://aa/bb/cc/one.bin")));
        assert!(set.unregister(&loc("store://aa/bb/cc/one.bin")));
        assert!(!set.unregister(&loc("store://aa/bb/cc/one.bin")));
        assert!(set.is_empty());
    }

    // -----------------------------------------------------------------------
    // Transaction
    // -----------------------------------------------------------------------

    #[test]
    fn set_is_created_lazily() {
        let mut txn = Transaction::begin();
        assert!(txn.pending().is_none());
        txn.pending_deletions();
        assert!(txn.pending().is_some_and(PendingDeletionSet::is_empty));
    }

    #[test]
    fn transaction_ids_are_unique() {
        let a = Transaction::begin();
        let b = Transaction::begin();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn rollback_without_writes_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentAddressStore::open(StoreConfig::new(dir.path())).unwrap();
        let report = Transaction::begin().rollback(&store);
        assert_eq!(report, RollbackReport::default());
        assert!(report.is_clean());
    }

    #[test]
    fn rollback_deletes_created_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentAddressStore::open(StoreConfig::new(dir.path())).unwrap();

        let mut txn = Transaction::begin();
        let mut session = store.open_write_session(None).unwrap();
        session.write_all(b"rolled back").unwrap();
        let done = session.close(&mut txn).unwrap();
        assert!(store.exists(&done.locator).unwrap());
        assert!(txn.pending().unwrap().contains(&done.locator));

        let report = txn.rollback(&store);
        assert_eq!(report.deleted, vec![done.locator.clone()]);
        assert!(!store.exists(&done.locator).unwrap());
    }

    #[test]
    fn commit_keeps_created_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentAddressStore::open(StoreConfig::new(dir.path())).unwrap();

        let mut txn = Transaction::begin();
        let mut session = store.open_write_session(None).unwrap();
        session.write_all(b"committed").unwrap();
        let done = session.close(&mut txn).unwrap();
        txn.commit();
        assert!(store.exists(&done.locator).unwrap());
    }

    #[test]
    fn sweep_reports_absent_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentAddressStore::open(StoreConfig::new(dir.path())).unwrap();
        let mut set = PendingDeletionSet::new();
        set.register(loc("store://aa/bb/cc/aabbccdd.bin"));
        let report = set.sweep(&store);
        assert_eq!(report.already_absent.len(), 1);
        assert!(report.deleted.is_empty());
        assert!(set.is_empty());
    }

    #[test]
    fn sweep_collects_failures() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentAddressStore::open(StoreConfig::new(dir.path())).unwrap();
        let mut set = PendingDeletionSet::new();
        set.register(loc("other://aa/bb/cc/aabbccdd.bin"));
        let report = set.sweep(&store);
        assert_eq!(report.failed.len(), 1);
        assert!(!report.is_clean());
    }
}
