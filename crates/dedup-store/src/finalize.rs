use std::fs::{self, File};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

use dedup_crypto::DigestingWriter;
use dedup_types::ContentLocator;
use tempfile::NamedTempFile;
use tracing::{debug, error, warn};

use crate::error::{StoreError, StoreResult};
use crate::store::ContentAddressStore;
use crate::txn::TransactionContext;

/// How a finalize ended up backing its locator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Materialization {
    /// This write created the blob and registered it for rollback deletion.
    Created,
    /// A blob with identical content already existed and was reused.
    Deduplicated,
    /// Copying failed and the failure was absorbed by configuration. The
    /// locator was published but no blob backs it.
    CopyFailed,
}

/// Result of a successful finalize.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinalizedContent {
    pub locator: ContentLocator,
    pub size: u64,
    /// Lowercase hex digest the locator was derived from.
    pub digest: String,
    pub outcome: Materialization,
}

/// Turns a closed write sink into a content-addressed blob.
///
/// Finalize computes the content locator from the digest accumulated while
/// writing, materializes the blob unless an identical one already exists, and
/// keeps the transaction's pending-deletion set in step: only a blob this
/// finalize actually created is registered, so rolling back never deletes
/// content another writer created. The temporary sink is removed on every
/// path.
///
/// The blob is staged in its bucket directory, synced, and moved into place
/// with a no-clobber rename. Concurrent finalizes of the same content
/// therefore never expose a partial blob, and exactly one of them reports
/// [`Materialization::Created`].
pub struct FinalizationCoordinator<'s> {
    store: &'s ContentAddressStore,
}

impl<'s> FinalizationCoordinator<'s> {
    pub fn new(store: &'s ContentAddressStore) -> Self {
        Self { store }
    }

    /// Finalize `sink`. `prior` is the locator the session reported before
    /// this call.
    pub fn finalize<T>(
        &self,
        sink: DigestingWriter<NamedTempFile>,
        prior: &ContentLocator,
        txn: &mut T,
    ) -> StoreResult<FinalizedContent>
    where
        T: TransactionContext + ?Sized,
    {
        let size = sink.bytes_written();
        let (mut temp, digester) = sink.into_parts();
        temp.flush()?;
        let digest = digester.finalize_hex();
        let locator = self.store.build_locator(&digest)?;
        let target = self.store.resolve(&locator)?;

        if !prior.is_placeholder() && prior != &locator {
            txn.pending_deletions().unregister(prior);
        }

        let outcome = if target.exists() {
            debug!(%locator, size, "content already stored; deduplicated");
            Materialization::Deduplicated
        } else {
            match materialize(temp.as_file_mut(), &target) {
                Ok(true) => {
                    txn.pending_deletions().register(locator.clone());
                    debug!(%locator, size, "content materialized");
                    Materialization::Created
                }
                Ok(false) => {
                    debug!(%locator, size, "lost creation race; deduplicated");
                    Materialization::Deduplicated
                }
                Err(err) if self.store.config().absorb_copy_failures => {
                    error!(%locator, error = %err, "failed to materialize content");
                    Materialization::CopyFailed
                }
                Err(source) => return Err(StoreError::Materialize { locator, source }),
            }
        };

        if let Err(err) = temp.close() {
            warn!(error = %err, "failed to remove temporary sink");
        }

        Ok(FinalizedContent {
            locator,
            size,
            digest,
            outcome,
        })
    }
}

/// Copy `source` to `target` without ever replacing an existing file.
///
/// Returns `Ok(false)` if another writer put the blob in place first. A
/// bucket directory pruned by a concurrent delete between creation and
/// rename is recreated once.
fn materialize(source: &mut File, target: &Path) -> io::Result<bool> {
    let bucket = target
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "blob path has no parent"))?;
    match stage_and_persist(source, bucket, target) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(bucket = %bucket.display(), "bucket vanished during finalize; retrying");
            stage_and_persist(source, bucket, target)
        }
        other => other,
    }
}

fn stage_and_persist(source: &mut File, bucket: &Path, target: &Path) -> io::Result<bool> {
    fs::create_dir_all(bucket)?;
    source.seek(SeekFrom::Start(0))?;
    let mut staged = tempfile::Builder::new()
        .prefix(".incoming-")
        .tempfile_in(bucket)?;
    io::copy(source, &mut staged)?;
    staged.as_file().sync_all()?;

    let mut permissions = staged.as_file().metadata()?.permissions();
    permissions.set_readonly(true);
    staged.as_file().set_permissions(permissions)?;

    match staged.persist_noclobber(target) {
        Ok(_) => Ok(true),
        Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(err) => Err(err.error),
    }
}
