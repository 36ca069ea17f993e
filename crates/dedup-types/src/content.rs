use serde::{Deserialize, Serialize};

use crate::locator::ContentLocator;

/// The `(locator, mimetype, encoding, size)` tuple handed back to the host's
/// content-property layer once a write has been finalized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentData {
    pub locator: ContentLocator,
    pub mimetype: Option<String>,
    pub encoding: Option<String>,
    pub size: u64,
}

impl ContentData {
    pub fn new(locator: ContentLocator, size: u64) -> Self {
        Self {
            locator,
            mimetype: None,
            encoding: None,
            size,
        }
    }

    pub fn with_mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.mimetype = Some(mimetype.into());
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// `true` when the data still carries the placeholder locator, i.e. the
    /// write it came from was never finalized.
    pub fn is_pending(&self) -> bool {
        self.locator.is_placeholder()
    }
}
