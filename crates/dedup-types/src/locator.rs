use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Separator between the scheme and the relative path of a locator.
pub const SCHEME_SEPARATOR: &str = "://";

/// Scheme of the placeholder locator a write session reports before it is
/// finalized. No store may be configured with this scheme.
pub const PLACEHOLDER_SCHEME: &str = "pending";

const PLACEHOLDER: &str = "pending://placeholder";

/// Opaque address of a stored blob, of the form `<scheme>://<relative-path>`.
///
/// For blobs produced by the content-address store the relative path is a
/// deterministic function of the blob's digest, so two locators built from
/// equal digests are byte-for-byte equal. The store owns the interpretation
/// of the relative path; everything else treats a locator as an opaque token.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentLocator(String);

impl ContentLocator {
    /// Build a locator from a scheme and a relative path.
    pub fn new(scheme: &str, relative_path: &str) -> Result<Self, TypeError> {
        Self::parse(format!("{scheme}{SCHEME_SEPARATOR}{relative_path}"))
    }

    /// Parse and validate a locator string.
    pub fn parse(value: impl Into<String>) -> Result<Self, TypeError> {
        let value = value.into();
        let invalid = |reason: &str| TypeError::InvalidLocator {
            locator: value.clone(),
            reason: reason.to_string(),
        };

        let (scheme, relative) = value
            .split_once(SCHEME_SEPARATOR)
            .ok_or_else(|| invalid("missing '://' separator"))?;
        if scheme.is_empty() {
            return Err(invalid("empty scheme"));
        }
        if !is_valid_scheme(scheme) {
            return Err(invalid("scheme contains invalid characters"));
        }
        if relative.is_empty() {
            return Err(invalid("empty relative path"));
        }
        Ok(Self(value))
    }

    /// The non-dereferenceable locator a write session reports until it has
    /// been finalized. It must never be persisted.
    pub fn placeholder() -> Self {
        Self(PLACEHOLDER.to_string())
    }

    /// Returns `true` if this is the placeholder locator.
    pub fn is_placeholder(&self) -> bool {
        self.0 == PLACEHOLDER
    }

    /// The scheme prefix (everything before `://`).
    pub fn scheme(&self) -> &str {
        self.parts().0
    }

    /// The path after the scheme separator.
    pub fn relative_path(&self) -> &str {
        self.parts().1
    }

    /// The full locator string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn parts(&self) -> (&str, &str) {
        // Validated at construction.
        self.0
            .split_once(SCHEME_SEPARATOR)
            .unwrap_or((self.0.as_str(), ""))
    }
}

/// Scheme syntax: ASCII alphanumerics plus `+`, `-` and `.`.
pub fn is_valid_scheme(scheme: &str) -> bool {
    !scheme.is_empty()
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

impl fmt::Debug for ContentLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentLocator({})", self.0)
    }
}

impl fmt::Display for ContentLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContentLocator {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ContentLocator {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ContentLocator> for String {
    fn from(locator: ContentLocator) -> Self {
        locator.0
    }
}

impl AsRef<str> for ContentLocator {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
