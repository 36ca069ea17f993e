use std::path::PathBuf;

use dedup_types::locator::{is_valid_scheme, PLACEHOLDER_SCHEME};
use dedup_types::DigestAlgorithm;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Scheme of locators produced by a default-configured store.
pub const DEFAULT_SCHEME: &str = "store";

/// Configuration for a [`ContentAddressStore`](crate::ContentAddressStore).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root directory; every blob lives below it.
    pub root: PathBuf,
    /// Locator scheme served by this store.
    pub scheme: String,
    /// Digest algorithm used to derive blob addresses.
    pub digest_algorithm: String,
    /// Remove now-empty bucket directories after a delete.
    pub delete_empty_dirs: bool,
    /// Refuse deletes and new write sessions.
    pub read_only: bool,
    /// Where write sessions put their temporary sink. `None` uses the system
    /// temporary directory.
    pub temp_dir: Option<PathBuf>,
    /// Log and swallow copy failures during finalize instead of failing the
    /// write. The locator is still published, so metadata may end up
    /// referencing a blob that does not exist.
    pub absorb_copy_failures: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("contentstore"),
            scheme: DEFAULT_SCHEME.to_string(),
            digest_algorithm: DigestAlgorithm::default().name().to_string(),
            delete_empty_dirs: true,
            read_only: false,
            temp_dir: None,
            absorb_copy_failures: false,
        }
    }
}

impl StoreConfig {
    /// Default configuration rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Check the configuration and resolve the addressing algorithm.
    pub fn validate(&self) -> StoreResult<DigestAlgorithm> {
        if !is_valid_scheme(&self.scheme) {
            return Err(StoreError::InvalidConfig(format!(
                "invalid scheme {:?}",
                self.scheme
            )));
        }
        if self.scheme == PLACEHOLDER_SCHEME {
            return Err(StoreError::InvalidConfig(format!(
                "scheme '{PLACEHOLDER_SCHEME}' is reserved for unfinalized writes"
            )));
        }
        if self.root.as_os_str().is_empty() {
            return Err(StoreError::InvalidConfig("empty root directory".into()));
        }
        self.digest_algorithm
            .parse::<DigestAlgorithm>()
            .map_err(|_| StoreError::UnsupportedAlgorithm(self.digest_algorithm.clone()))
    }
}
