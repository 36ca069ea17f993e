use std::fmt;
use std::fs::File;
use std::io::{self, Read};

use dedup_types::ContentLocator;

/// Readable stream over a stored blob.
///
/// A reader for a locator whose blob does not exist is not an error: it is
/// the explicit [`ContentReader::exists`]`() == false` variant that yields no
/// bytes and reports size 0. Lookups against not-yet-materialized or stale
/// locators rely on this.
pub struct ContentReader {
    locator: ContentLocator,
    source: Source,
}

enum Source {
    File { file: File, size: u64 },
    Empty,
}

impl ContentReader {
    pub(crate) fn file(locator: ContentLocator, file: File, size: u64) -> Self {
        Self {
            locator,
            source: Source::File { file, size },
        }
    }

    /// Reader over no content at all.
    pub fn empty(locator: ContentLocator) -> Self {
        Self {
            locator,
            source: Source::Empty,
        }
    }

    /// The locator this reader was created for.
    pub fn locator(&self) -> &ContentLocator {
        &self.locator
    }

    /// Returns `true` if a blob backs this reader.
    pub fn exists(&self) -> bool {
        matches!(self.source, Source::File { .. })
    }

    /// Size of the blob in bytes (0 for empty content).
    pub fn size(&self) -> u64 {
        match &self.source {
            Source::File { size, .. } => *size,
            Source::Empty => 0,
        }
    }

    /// Read the remaining content into memory.
    pub fn read_to_vec(mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.size() as usize);
        self.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl Read for ContentReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.source {
            Source::File { file, .. } => file.read(buf),
            Source::Empty => Ok(0),
        }
    }
}

impl fmt::Debug for ContentReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentReader")
            .field("locator", &self.locator)
            .field("exists", &self.exists())
            .field("size", &self.size())
            .finish()
    }
}
