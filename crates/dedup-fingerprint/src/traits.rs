use std::io::Read;
use std::sync::Arc;

use dedup_types::{ContentData, NodeRef, PropertyName};

use crate::error::FingerprintResult;

/// The host's node-property layer, as far as fingerprints are concerned.
///
/// Fingerprints are stored as an ordered list of encoded records. A node
/// either carries the list (its fingerprint marker is present) or does not;
/// an empty list is never stored.
pub trait NodeMetadata: Send + Sync {
    /// Returns `true` if the node currently carries fingerprints.
    fn has_fingerprints(&self, node: &NodeRef) -> FingerprintResult<bool>;

    /// The node's encoded fingerprint list, or `None` if it has none.
    fn fingerprints(&self, node: &NodeRef) -> FingerprintResult<Option<Vec<String>>>;

    /// Replace the node's fingerprint list.
    fn set_fingerprints(&self, node: &NodeRef, encoded: Vec<String>) -> FingerprintResult<()>;

    /// Drop the fingerprint list and marker from the node.
    fn remove_fingerprints(&self, node: &NodeRef) -> FingerprintResult<()>;
}

/// Byte streams over a node's property content.
pub trait ContentSource: Send + Sync {
    /// Open a fresh reader over the current content of `property` on `node`.
    fn open_content(
        &self,
        node: &NodeRef,
        property: &PropertyName,
    ) -> FingerprintResult<Box<dyn Read + Send>>;
}

/// Notification that a content property of a node changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentPropertyUpdate {
    pub node: NodeRef,
    pub property: PropertyName,
    /// Content before the change, if the property was set.
    pub before: Option<ContentData>,
    /// Content after the change; `None` when the content was removed.
    pub after: Option<ContentData>,
}

impl<T: NodeMetadata + ?Sized> NodeMetadata for Arc<T> {
    fn has_fingerprints(&self, node: &NodeRef) -> FingerprintResult<bool> {
        (**self).has_fingerprints(node)
    }

    fn fingerprints(&self, node: &NodeRef) -> FingerprintResult<Option<Vec<String>>> {
        (**self).fingerprints(node)
    }

    fn set_fingerprints(&self, node: &NodeRef, encoded: Vec<String>) -> FingerprintResult<()> {
        (**self).set_fingerprints(node, encoded)
    }

    fn remove_fingerprints(&self, node: &NodeRef) -> FingerprintResult<()> {
        (**self).remove_fingerprints(node)
    }
}

impl<T: ContentSource + ?Sized> ContentSource for Arc<T> {
    fn open_content(
        &self,
        node: &NodeRef,
        property: &PropertyName,
    ) -> FingerprintResult<Box<dyn Read + Send>> {
        (**self).open_content(node, property)
    }
}
