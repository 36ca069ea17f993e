use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A cryptographic hash function the store and catalog know how to compute.
///
/// One algorithm is selected for the store's own addressing; an independent,
/// ordered list is selected for the fingerprint catalog.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DigestAlgorithm {
    /// SHA-1, 160-bit. The default addressing algorithm.
    #[default]
    Sha1,
    /// MD5, 128-bit. Kept for fingerprints recorded by older producers.
    Md5,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Blake3,
}

impl DigestAlgorithm {
    /// Every supported algorithm, in a stable order.
    pub const ALL: [DigestAlgorithm; 7] = [
        Self::Sha1,
        Self::Md5,
        Self::Sha224,
        Self::Sha256,
        Self::Sha384,
        Self::Sha512,
        Self::Blake3,
    ];

    /// Canonical name, as written into fingerprint records.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha1 => "SHA-1",
            Self::Md5 => "MD5",
            Self::Sha224 => "SHA-224",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
            Self::Blake3 => "BLAKE3",
        }
    }

    /// Output length in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 => 20,
            Self::Sha224 => 28,
            Self::Sha256 | Self::Blake3 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Output length in lowercase hex characters.
    pub fn hex_len(&self) -> usize {
        self.output_len() * 2
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = TypeError;

    /// Case-insensitive; the hyphen in `SHA-256` is optional.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        match normalized.as_str() {
            "SHA1" | "SHA" => Ok(Self::Sha1),
            "MD5" => Ok(Self::Md5),
            "SHA224" => Ok(Self::Sha224),
            "SHA256" => Ok(Self::Sha256),
            "SHA384" => Ok(Self::Sha384),
            "SHA512" => Ok(Self::Sha512),
            "BLAKE3" => Ok(Self::Blake3),
            _ => Err(TypeError::UnknownAlgorithm(s.trim().to_string())),
        }
    }
}

impl TryFrom<String> for DigestAlgorithm {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DigestAlgorithm> for String {
    fn from(alg: DigestAlgorithm) -> Self {
        alg.name().to_string()
    }
}
