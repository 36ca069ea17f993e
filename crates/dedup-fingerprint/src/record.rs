use std::fmt;
use std::str::FromStr;

use dedup_types::{DigestAlgorithm, PropertyName};
use serde::{Deserialize, Serialize};

use crate::error::{FingerprintError, FingerprintResult};

/// Field delimiter of the encoded form.
pub const FIELD_SEPARATOR: char = '|';

/// One fingerprint: the digest of a property's content under one algorithm.
///
/// Encodes as `<property>|<algorithm>|<hex digest>`. The algorithm is kept as
/// the name it was recorded under, so records written by other producers
/// still decode even if the name is not one this crate can compute.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FingerprintRecord {
    property: PropertyName,
    algorithm: String,
    digest: String,
}

impl FingerprintRecord {
    /// Record a digest computed with a known algorithm.
    pub fn new(property: PropertyName, algorithm: DigestAlgorithm, digest: impl Into<String>) -> Self {
        Self {
            property,
            algorithm: algorithm.name().to_string(),
            digest: digest.into(),
        }
    }

    /// Build a record from raw parts, validating them the way decoding does.
    pub fn from_parts(
        property: PropertyName,
        algorithm: impl Into<String>,
        digest: impl Into<String>,
    ) -> FingerprintResult<Self> {
        let algorithm = algorithm.into();
        let digest = digest.into();
        let input = format!("{property}{FIELD_SEPARATOR}{algorithm}{FIELD_SEPARATOR}{digest}");
        validate_field(&input, "algorithm", &algorithm)?;
        validate_field(&input, "digest", &digest)?;
        Ok(Self {
            property,
            algorithm,
            digest,
        })
    }

    pub fn property(&self) -> &PropertyName {
        &self.property
    }

    /// The algorithm name as recorded.
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// The recorded algorithm, if it is one this crate knows.
    pub fn digest_algorithm(&self) -> Option<DigestAlgorithm> {
        self.algorithm.parse().ok()
    }

    /// Hex digest value.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Returns `true` if this record describes `property` under `algorithm`.
    pub fn matches(&self, property: &PropertyName, algorithm: DigestAlgorithm) -> bool {
        &self.property == property && self.digest_algorithm() == Some(algorithm)
    }
}

fn validate_field(input: &str, field: &str, value: &str) -> FingerprintResult<()> {
    let parse_error = |reason: String| FingerprintError::Parse {
        input: input.to_string(),
        reason,
    };
    if value.is_empty() {
        return Err(parse_error(format!("empty {field}")));
    }
    if value.contains(FIELD_SEPARATOR) {
        return Err(parse_error(format!("{field} contains '{FIELD_SEPARATOR}'")));
    }
    Ok(())
}

impl fmt::Display for FingerprintRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}",
            self.property, self.algorithm, self.digest
        )
    }
}

impl fmt::Debug for FingerprintRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FingerprintRecord({self})")
    }
}

impl FromStr for FingerprintRecord {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(FIELD_SEPARATOR).collect();
        let [property, algorithm, digest] = fields[..] else {
            return Err(FingerprintError::Parse {
                input: s.to_string(),
                reason: format!("expected 3 fields, found {}", fields.len()),
            });
        };
        let property = property
            .parse::<PropertyName>()
            .map_err(|err| FingerprintError::Parse {
                input: s.to_string(),
                reason: err.to_string(),
            })?;
        Self::from_parts(property, algorithm, digest)
    }
}

impl TryFrom<String> for FingerprintRecord {
    type Error = FingerprintError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FingerprintRecord> for String {
    fn from(record: FingerprintRecord) -> Self {
        record.to_string()
    }
}
