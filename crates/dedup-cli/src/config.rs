use std::path::{Path, PathBuf};

use anyhow::Context;
use dedup_fingerprint::FingerprintConfig;
use dedup_store::StoreConfig;
use serde::{Deserialize, Serialize};

/// Contents of the `dedup` configuration file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub store: StoreConfig,
    pub fingerprint: FingerprintConfig,
}

impl CliConfig {
    /// Load from `path` if given, then apply the root override.
    pub fn load(path: Option<&Path>, root: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))?
            }
            None => Self::default(),
        };
        if let Some(root) = root {
            config.store.root = root;
        }
        Ok(config)
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }
}
