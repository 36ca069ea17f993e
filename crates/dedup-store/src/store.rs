use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

use dedup_crypto::DigestingWriter;
use dedup_types::{ContentLocator, DigestAlgorithm};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::reader::ContentReader;
use crate::session::WriteSession;

/// File extension of every materialized blob.
pub const BLOB_EXTENSION: &str = "bin";

/// Number of two-character directory levels above each blob.
pub const BUCKET_DEPTH: usize = 3;

/// Filesystem-backed, content-addressed blob store.
///
/// Blobs live at `<root>/<d[0..2]>/<d[2..4]>/<d[4..6]>/<d>.bin` where `d` is
/// the lowercase hex digest of the content. Locators are
/// `<scheme>://<same relative path>`. A blob is never modified after it is
/// created; it only ever goes away through [`ContentAddressStore::delete`].
///
/// The store is `Send + Sync` and every operation takes `&self`; concurrent
/// writers of identical content converge on one blob.
#[derive(Debug)]
pub struct ContentAddressStore {
    config: StoreConfig,
    algorithm: DigestAlgorithm,
}

impl ContentAddressStore {
    /// Open a store, creating its root directory if it is writable.
    ///
    /// Fails if the configured digest algorithm is not available: such a
    /// store could never address a single write.
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        let algorithm = config.validate()?;
        if !config.read_only {
            fs::create_dir_all(&config.root)?;
        }
        info!(
            root = %config.root.display(),
            scheme = %config.scheme,
            %algorithm,
            read_only = config.read_only,
            "content store opened"
        );
        Ok(Self { config, algorithm })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn scheme(&self) -> &str {
        &self.config.scheme
    }

    /// The addressing algorithm, fixed for the lifetime of the store.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    pub fn is_read_only(&self) -> bool {
        self.config.read_only
    }

    /// Map a locator to the blob's path below the root.
    pub fn resolve(&self, locator: &ContentLocator) -> StoreResult<PathBuf> {
        if locator.scheme() != self.config.scheme {
            return Err(StoreError::UnsupportedScheme {
                locator: locator.clone(),
                expected: self.config.scheme.clone(),
            });
        }
        let relative = Path::new(locator.relative_path());
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(StoreError::InvalidLocator {
                locator: locator.to_string(),
                reason: "relative path must stay below the store root".into(),
            });
        }
        if !is_blob_path(locator.relative_path()) {
            return Err(StoreError::InvalidLocator {
                locator: locator.to_string(),
                reason: "not a blob locator".into(),
            });
        }
        Ok(self.config.root.join(relative))
    }

    /// Locator of the blob whose content has the given hex digest.
    pub fn build_locator(&self, digest_hex: &str) -> StoreResult<ContentLocator> {
        let relative = relative_path_for(digest_hex)?;
        Ok(ContentLocator::new(&self.config.scheme, &relative)?)
    }

    /// Returns `true` if a blob exists for the locator.
    pub fn exists(&self, locator: &ContentLocator) -> StoreResult<bool> {
        let path = self.resolve(locator)?;
        Ok(path.try_exists()?)
    }

    /// Open a reader for the locator.
    ///
    /// A missing blob is not an error: the reader reports
    /// [`ContentReader::exists`]` == false` and yields no bytes.
    pub fn read(&self, locator: &ContentLocator) -> StoreResult<ContentReader> {
        let path = self.resolve(locator)?;
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(%locator, "content not found; returning empty reader");
                return Ok(ContentReader::empty(locator.clone()));
            }
            Err(err) => return Err(err.into()),
        };
        let metadata = file.metadata()?;
        if !metadata.is_file() {
            return Err(StoreError::InvalidLocator {
                locator: locator.to_string(),
                reason: "locator does not name a blob".into(),
            });
        }
        Ok(ContentReader::file(locator.clone(), file, metadata.len()))
    }

    /// Start a new write.
    ///
    /// `existing` is the reader for the content being replaced, if any. Its
    /// locator is recorded as the session's previous locator.
    pub fn open_write_session(
        &self,
        existing: Option<&ContentReader>,
    ) -> StoreResult<WriteSession<'_>> {
        if self.config.read_only {
            return Err(StoreError::ReadOnly(self.config.root.clone()));
        }
        let mut builder = tempfile::Builder::new();
        builder.prefix("dedup-").suffix(".tmp");
        let temp = match &self.config.temp_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                builder.tempfile_in(dir)?
            }
            None => builder.tempfile()?,
        };
        debug!(
            temp = %temp.path().display(),
            algorithm = %self.algorithm,
            "write session opened"
        );
        let sink = DigestingWriter::new(temp, self.algorithm);
        Ok(WriteSession::new(
            self,
            sink,
            existing.map(|reader| reader.locator().clone()),
        ))
    }

    /// Remove a blob.
    ///
    /// Returns `Ok(true)` if a blob was removed and `Ok(false)` if there was
    /// nothing to remove. When `delete_empty_dirs` is set, bucket directories
    /// left empty by the removal are pruned up to (never including) the root.
    pub fn delete(&self, locator: &ContentLocator) -> StoreResult<bool> {
        if self.config.read_only {
            return Err(StoreError::ReadOnly(self.config.root.clone()));
        }
        let path = self.resolve(locator)?;
        let removed = match fs::remove_file(&path) {
            Ok(()) => true,
            Err(err) if err.kind() == io::ErrorKind::NotFound => false,
            Err(err) => return Err(err.into()),
        };
        if removed && self.config.delete_empty_dirs {
            self.prune_empty_parents(&path);
        }
        debug!(%locator, removed, "content deleted");
        Ok(removed)
    }

    /// Every blob currently in the store, in path order.
    ///
    /// Files that are not blobs (such as staging files of in-flight
    /// finalizes) are skipped.
    pub fn locators(&self) -> StoreResult<Vec<ContentLocator>> {
        let mut locators = Vec::new();
        for entry in WalkDir::new(&self.config.root)
            .min_depth(BUCKET_DEPTH + 1)
            .max_depth(BUCKET_DEPTH + 1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.config.root) else {
                continue;
            };
            let relative = relative
                .components()
                .filter_map(|c| c.as_os_str().to_str())
                .collect::<Vec<_>>()
                .join("/");
            if is_blob_path(&relative) {
                locators.push(ContentLocator::new(&self.config.scheme, &relative)?);
            } else {
                debug!(path = %entry.path().display(), "skipping non-blob file");
            }
        }
        Ok(locators)
    }

    fn prune_empty_parents(&self, path: &Path) {
        let mut dir = path.parent();
        while let Some(current) = dir {
            if current == self.config.root || !current.starts_with(&self.config.root) {
                break;
            }
            match fs::remove_dir(current) {
                Ok(()) => debug!(dir = %current.display(), "pruned empty bucket"),
                // Non-empty, or already pruned by someone else.
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(_) => break,
            }
            dir = current.parent();
        }
    }
}

/// Relative blob path for a hex digest: three two-character buckets, then
/// the full digest with the blob extension.
pub fn relative_path_for(digest_hex: &str) -> StoreResult<String> {
    bucketed(digest_hex).ok_or_else(|| {
        warn!(digest = digest_hex, "refusing to address invalid digest");
        StoreError::InvalidDigest(digest_hex.to_string())
    })
}

fn bucketed(digest_hex: &str) -> Option<String> {
    let valid = digest_hex.len() >= 2 * BUCKET_DEPTH
        && digest_hex
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    valid.then(|| {
        format!(
            "{}/{}/{}/{digest_hex}.{BLOB_EXTENSION}",
            &digest_hex[0..2],
            &digest_hex[2..4],
            &digest_hex[4..6],
        )
    })
}

/// Returns `true` if `relative` is exactly the path [`relative_path_for`]
/// builds for the digest in its file name.
fn is_blob_path(relative: &str) -> bool {
    relative
        .rsplit('/')
        .next()
        .and_then(|name| name.strip_suffix(BLOB_EXTENSION))
        .and_then(|stem| stem.strip_suffix('.'))
        .and_then(bucketed)
        .is_some_and(|expected| expected == relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::txn::Transaction;
    use std::io::Write;

    const HELLO_LOCATOR: &str = "store://aa/f4/c6/aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d.bin";

    fn open_store(dir: &Path) -> ContentAddressStore {
        ContentAddressStore::open(StoreConfig::new(dir)).unwrap()
    }

    fn put(store: &ContentAddressStore, data: &[u8]) -> ContentLocator {
        let mut txn = Transaction::begin();
        let mut session = store.open_write_session(None).unwrap();
        session.write_all(data).unwrap();
        let done = session.close(&mut txn).unwrap();
        txn.commit();
        done.locator
    }

    // -----------------------------------------------------------------------
    // Addressing
    // -----------------------------------------------------------------------

    #[test]
    fn hello_locator_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        let loc = store
            .build_locator("aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d")
            .unwrap();
        assert_eq!(loc.as_str(), HELLO_LOCATOR);
        assert_eq!(
            store.resolve(&loc).unwrap(),
            dir.path()
                .join("aa/f4/c6/aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d.bin")
        );
    }

    #[test]
    fn invalid_digests_are_rejected() {
        assert!(matches!(relative_path_for("abc"), Err(StoreError::InvalidDigest(_))));
        assert!(matches!(relative_path_for("AAF4C61D"), Err(StoreError::InvalidDigest(_))));
        assert!(matches!(relative_path_for("zz0000"), Err(StoreError::InvalidDigest(_))));
        assert_eq!(relative_path_for("abcdef").unwrap(), "ab/cd/ef/abcdef.bin");
    }

    #[test]
    fn custom_scheme_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            scheme: "cas".into(),
            ..StoreConfig::new(dir.path())
        };
        let store = ContentAddressStore::open(config).unwrap();
        let loc = store.build_locator("abcdef01").unwrap();
        assert_eq!(loc.as_str(), "cas://ab/cd/ef/abcdef01.bin");
    }

    #[test]
    fn open_creates_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested/root");
        let store = open_store(&root);
        assert!(root.is_dir());
        assert_eq!(store.root(), root);
        assert_eq!(store.algorithm(), DigestAlgorithm::Sha1);
    }

    // -----------------------------------------------------------------------
    // Resolve
    // -----------------------------------------------------------------------

    #[test]
    fn foreign_scheme_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        let other = ContentLocator::parse("other://aa/f4/c6/x.bin").unwrap();
        assert!(matches!(
            store.read(&other),
            Err(StoreError::UnsupportedScheme { .. })
        ));
        assert!(matches!(
            store.exists(&other),
            Err(StoreError::UnsupportedScheme { .. })
        ));
        assert!(matches!(
            store.delete(&other),
            Err(StoreError::UnsupportedScheme { .. })
        ));
    }

    #[test]
    fn placeholder_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        assert!(matches!(
            store.read(&ContentLocator::placeholder()),
            Err(StoreError::UnsupportedScheme { .. })
        ));
    }

    #[test]
    fn non_blob_paths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        for bad in [
            "store://README",
            "store://aa/f4/c6",
            "store://aa/f4/c6/.incoming-x1y2",
            "store://aa/f4/c6/aaf4c61d.tmp",
            "store://bb/f4/c6/aaf4c61d.bin",
            "store://aa/f4/c6/AAF4C61D.bin",
        ] {
            let loc = ContentLocator::parse(bad).unwrap();
            assert!(
                matches!(store.resolve(&loc), Err(StoreError::InvalidLocator { .. })),
                "{bad}"
            );
        }
    }

    #[test]
    fn delete_refuses_files_outside_the_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        let readme = dir.path().join("README");
        std::fs::write(&readme, b"keep me").unwrap();
        let loc = ContentLocator::parse("store://README").unwrap();
        assert!(matches!(
            store.delete(&loc),
            Err(StoreError::InvalidLocator { .. })
        ));
        assert!(readme.exists());
    }

    #[test]
    fn read_of_staging_file_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        let bucket = dir.path().join("aa/f4/c6");
        std::fs::create_dir_all(&bucket).unwrap();
        std::fs::write(bucket.join(".incoming-abc"), b"partial").unwrap();
        let loc = ContentLocator::parse("store://aa/f4/c6/.incoming-abc").unwrap();
        assert!(matches!(
            store.read(&loc),
            Err(StoreError::InvalidLocator { .. })
        ));
    }

    #[test]
    fn traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        for bad in ["store://../etc/passwd", "store:///etc/passwd", "store://./aa/b.bin"] {
            let loc = ContentLocator::parse(bad).unwrap();
            assert!(
                matches!(store.resolve(&loc), Err(StoreError::InvalidLocator { .. })),
                "{bad}"
            );
        }
    }

    // -----------------------------------------------------------------------
    // Read
    // -----------------------------------------------------------------------

    #[test]
    fn read_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        let loc = ContentLocator::parse(HELLO_LOCATOR).unwrap();
        let reader = store.read(&loc).unwrap();
        assert!(!reader.exists());
        assert_eq!(reader.size(), 0);
        assert!(reader.read_to_vec().unwrap().is_empty());
    }

    #[test]
    fn read_returns_stored_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        let loc = put(&store, b"hello");
        assert_eq!(loc.as_str(), HELLO_LOCATOR);
        let reader = store.read(&loc).unwrap();
        assert!(reader.exists());
        assert_eq!(reader.size(), 5);
        assert_eq!(reader.read_to_vec().unwrap(), b"hello");
    }

    #[test]
    fn read_of_bucket_directory_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        put(&store, b"hello");
        let bucket = ContentLocator::parse("store://aa/f4/c6").unwrap();
        assert!(matches!(
            store.read(&bucket),
            Err(StoreError::InvalidLocator { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    #[test]
    fn delete_removes_blob_and_prunes_buckets() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        let loc = put(&store, b"hello");
        assert!(store.delete(&loc).unwrap());
        assert!(!store.exists(&loc).unwrap());
        assert!(!dir.path().join("aa").exists());
        assert!(dir.path().is_dir());
    }

    #[test]
    fn delete_keeps_shared_buckets() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        let loc = put(&store, b"hello");
        // Same first bucket as the hello blob.
        let sibling = dir.path().join("aa/00/00/aa0000.bin");
        fs::create_dir_all(sibling.parent().unwrap()).unwrap();
        fs::write(&sibling, b"x").unwrap();

        assert!(store.delete(&loc).unwrap());
        assert!(!dir.path().join("aa/f4").exists());
        assert!(dir.path().join("aa").is_dir());
        assert!(sibling.exists());
    }

    #[test]
    fn delete_without_pruning_keeps_buckets() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            delete_empty_dirs: false,
            ..StoreConfig::new(dir.path())
        };
        let store = ContentAddressStore::open(config).unwrap();
        let loc = put(&store, b"hello");
        assert!(store.delete(&loc).unwrap());
        assert!(dir.path().join("aa/f4/c6").is_dir());
    }

    #[test]
    fn delete_missing_is_false() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        let loc = ContentLocator::parse(HELLO_LOCATOR).unwrap();
        assert!(!store.delete(&loc).unwrap());
    }

    #[test]
    fn read_only_store_refuses_writes_and_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let loc = put(&open_store(dir.path()), b"hello");

        let config = StoreConfig {
            read_only: true,
            ..StoreConfig::new(dir.path())
        };
        let store = ContentAddressStore::open(config).unwrap();
        assert!(store.is_read_only());
        assert!(matches!(store.delete(&loc), Err(StoreError::ReadOnly(_))));
        assert!(matches!(
            store.open_write_session(None),
            Err(StoreError::ReadOnly(_))
        ));
        assert!(store.exists(&loc).unwrap());
        assert_eq!(store.read(&loc).unwrap().read_to_vec().unwrap(), b"hello");
    }

    // -----------------------------------------------------------------------
    // Listing
    // -----------------------------------------------------------------------

    #[test]
    fn locators_lists_blobs_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        let a = put(&store, b"hello");
        let b = put(&store, b"world");
        fs::write(dir.path().join("aa/f4/c6/.incoming-stray"), b"partial").unwrap();
        fs::write(dir.path().join("README"), b"not a blob").unwrap();

        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(store.locators().unwrap(), expected);
    }

    #[test]
    fn locators_of_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        assert!(store.locators().unwrap().is_empty());
    }
}
