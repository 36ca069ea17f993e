use dedup_types::DigestAlgorithm;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Fingerprinting configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    /// Comma-separated digest algorithm names, in the order records should be
    /// produced. Empty disables fingerprinting.
    pub digest_algorithms: String,
}

impl FingerprintConfig {
    pub fn new(digest_algorithms: impl Into<String>) -> Self {
        Self {
            digest_algorithms: digest_algorithms.into(),
        }
    }
}

/// The frozen, ordered list of algorithms the catalog computes.
///
/// Built once from configuration. Blank entries are ignored, duplicates keep
/// their first position, and names that do not denote a supported algorithm
/// are logged and skipped so the remaining algorithms still run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FingerprintAlgorithms {
    algorithms: Vec<DigestAlgorithm>,
    unsupported: Vec<String>,
}

impl FingerprintAlgorithms {
    /// Parse a comma-separated list such as `"SHA-256, SHA-512"`.
    pub fn parse(list: &str) -> Self {
        let mut parsed = Self::default();
        for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            match name.parse::<DigestAlgorithm>() {
                Ok(algorithm) if parsed.algorithms.contains(&algorithm) => {
                    debug!(algorithm = name, "ignoring duplicate fingerprint algorithm");
                }
                Ok(algorithm) => parsed.algorithms.push(algorithm),
                Err(_) => {
                    warn!(algorithm = name, "digest algorithm not available; skipping");
                    parsed.unsupported.push(name.to_string());
                }
            }
        }
        parsed
    }

    pub fn from_config(config: &FingerprintConfig) -> Self {
        Self::parse(&config.digest_algorithms)
    }

    pub fn as_slice(&self) -> &[DigestAlgorithm] {
        &self.algorithms
    }

    pub fn iter(&self) -> impl Iterator<Item = DigestAlgorithm> + '_ {
        self.algorithms.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.algorithms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.algorithms.is_empty()
    }

    /// Configured names that were skipped.
    pub fn unsupported(&self) -> &[String] {
        &self.unsupported
    }
}

impl From<Vec<DigestAlgorithm>> for FingerprintAlgorithms {
    fn from(mut algorithms: Vec<DigestAlgorithm>) -> Self {
        let mut seen = Vec::with_capacity(algorithms.len());
        algorithms.retain(|a| {
            let first = !seen.contains(a);
            seen.push(*a);
            first
        });
        Self {
            algorithms,
            unsupported: Vec::new(),
        }
    }
}
