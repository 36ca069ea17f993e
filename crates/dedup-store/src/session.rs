use std::fmt;
use std::io::{self, Write};

use dedup_crypto::DigestingWriter;
use dedup_types::{ContentData, ContentLocator};
use tempfile::NamedTempFile;

use crate::error::{StoreError, StoreResult};
use crate::finalize::{FinalizationCoordinator, FinalizedContent};
use crate::store::ContentAddressStore;
use crate::txn::TransactionContext;

/// One in-progress write against a [`ContentAddressStore`].
///
/// Bytes go to a private temporary sink and are digested as they are written.
/// Until [`WriteSession::close`] succeeds the session reports the placeholder
/// locator; afterwards it reports the content-derived locator of the
/// materialized blob. Dropping an unclosed session discards the sink.
pub struct WriteSession<'s> {
    store: &'s ContentAddressStore,
    state: State,
    previous: Option<ContentLocator>,
    mimetype: Option<String>,
    encoding: Option<String>,
}

enum State {
    Open(DigestingWriter<NamedTempFile>),
    Finalized(FinalizedContent),
    Failed,
}

impl<'s> WriteSession<'s> {
    pub(crate) fn new(
        store: &'s ContentAddressStore,
        sink: DigestingWriter<NamedTempFile>,
        previous: Option<ContentLocator>,
    ) -> Self {
        Self {
            store,
            state: State::Open(sink),
            previous,
            mimetype: None,
            encoding: None,
        }
    }

    pub fn set_mimetype(&mut self, mimetype: impl Into<String>) {
        self.mimetype = Some(mimetype.into());
    }

    pub fn set_encoding(&mut self, encoding: impl Into<String>) {
        self.encoding = Some(encoding.into());
    }

    /// Bytes written so far, or the final size once finalized.
    pub fn current_size(&self) -> u64 {
        match &self.state {
            State::Open(sink) => sink.bytes_written(),
            State::Finalized(content) => content.size,
            State::Failed => 0,
        }
    }

    /// The placeholder before finalize, the blob's locator after.
    pub fn current_locator(&self) -> ContentLocator {
        match &self.state {
            State::Finalized(content) => content.locator.clone(),
            State::Open(_) | State::Failed => ContentLocator::placeholder(),
        }
    }

    /// Locator of the content this write replaces, if any.
    pub fn previous_locator(&self) -> Option<&ContentLocator> {
        self.previous.as_ref()
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self.state, State::Finalized(_))
    }

    /// Content description for the host's metadata.
    pub fn content_data(&self) -> ContentData {
        let mut data = ContentData::new(self.current_locator(), self.current_size());
        data.mimetype = self.mimetype.clone();
        data.encoding = self.encoding.clone();
        data
    }

    /// Finish the write and publish the blob's content-derived locator.
    ///
    /// Newly materialized blobs are registered with `txn` for deletion on
    /// rollback. Closing an already finalized session returns the same result
    /// again; closing after a failed finalize is [`StoreError::SessionClosed`].
    pub fn close<T>(&mut self, txn: &mut T) -> StoreResult<FinalizedContent>
    where
        T: TransactionContext + ?Sized,
    {
        let prior = self.current_locator();
        match std::mem::replace(&mut self.state, State::Failed) {
            State::Open(sink) => {
                let content = FinalizationCoordinator::new(self.store).finalize(sink, &prior, txn)?;
                self.state = State::Finalized(content.clone());
                Ok(content)
            }
            State::Finalized(content) => {
                self.state = State::Finalized(content.clone());
                Ok(content)
            }
            State::Failed => Err(StoreError::SessionClosed),
        }
    }
}

impl Write for WriteSession<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.state {
            State::Open(sink) => sink.write(buf),
            _ => Err(io::Error::other(StoreError::SessionClosed)),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.state {
            State::Open(sink) => sink.flush(),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for WriteSession<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteSession")
            .field("locator", &self.current_locator())
            .field("size", &self.current_size())
            .field("previous", &self.previous)
            .finish()
    }
}
