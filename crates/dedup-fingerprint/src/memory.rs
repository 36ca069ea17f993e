//! In-memory node registry and store-backed content source.
//!
//! [`InMemoryNodeStore`] keeps nodes, their content properties and their
//! encoded fingerprints in a `HashMap` behind a `RwLock`. It implements
//! [`NodeMetadata`] and is suitable for tests, the command-line tool and
//! embedding. [`StoreContentSource`] resolves a node's content through a
//! [`ContentAddressStore`].

use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::sync::{Arc, RwLock};

use dedup_store::ContentAddressStore;
use dedup_types::{ContentData, NodeRef, PropertyName};
use tracing::debug;

use crate::error::{FingerprintError, FingerprintResult};
use crate::traits::{ContentPropertyUpdate, ContentSource, NodeMetadata};

#[derive(Debug, Default)]
struct NodeEntry {
    content: BTreeMap<PropertyName, ContentData>,
    fingerprints: Option<Vec<String>>,
}

/// An in-memory implementation of [`NodeMetadata`].
#[derive(Debug, Default)]
pub struct InMemoryNodeStore {
    nodes: RwLock<HashMap<NodeRef, NodeEntry>>,
}

impl InMemoryNodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node. Returns `false` if it already existed.
    pub fn create_node(&self, node: NodeRef) -> bool {
        let mut nodes = self.nodes.write().expect("node store lock poisoned");
        if nodes.contains_key(&node) {
            return false;
        }
        nodes.insert(node, NodeEntry::default());
        true
    }

    pub fn contains(&self, node: &NodeRef) -> bool {
        self.nodes
            .read()
            .expect("node store lock poisoned")
            .contains_key(node)
    }

    /// Current content of a property.
    pub fn content(&self, node: &NodeRef, property: &PropertyName) -> FingerprintResult<Option<ContentData>> {
        let nodes = self.nodes.read().expect("node store lock poisoned");
        let entry = nodes
            .get(node)
            .ok_or_else(|| FingerprintError::NodeNotFound(node.clone()))?;
        Ok(entry.content.get(property).cloned())
    }

    /// Set a content property, returning the change notification to deliver
    /// to the catalog.
    pub fn set_content(
        &self,
        node: &NodeRef,
        property: &PropertyName,
        data: ContentData,
    ) -> FingerprintResult<ContentPropertyUpdate> {
        let mut nodes = self.nodes.write().expect("node store lock poisoned");
        let entry = nodes
            .get_mut(node)
            .ok_or_else(|| FingerprintError::NodeNotFound(node.clone()))?;
        let before = entry.content.insert(property.clone(), data.clone());
        debug!(%node, %property, locator = %data.locator, "content property set");
        Ok(ContentPropertyUpdate {
            node: node.clone(),
            property: property.clone(),
            before,
            after: Some(data),
        })
    }

    /// Remove a content property, returning the change notification.
    pub fn remove_content(
        &self,
        node: &NodeRef,
        property: &PropertyName,
    ) -> FingerprintResult<ContentPropertyUpdate> {
        let mut nodes = self.nodes.write().expect("node store lock poisoned");
        let entry = nodes
            .get_mut(node)
            .ok_or_else(|| FingerprintError::NodeNotFound(node.clone()))?;
        let before = entry.content.remove(property);
        debug!(%node, %property, "content property removed");
        Ok(ContentPropertyUpdate {
            node: node.clone(),
            property: property.clone(),
            before,
            after: None,
        })
    }

    fn with_entry<R>(
        &self,
        node: &NodeRef,
        f: impl FnOnce(&mut NodeEntry) -> R,
    ) -> FingerprintResult<R> {
        let mut nodes = self.nodes.write().expect("node store lock poisoned");
        let entry = nodes
            .get_mut(node)
            .ok_or_else(|| FingerprintError::NodeNotFound(node.clone()))?;
        Ok(f(entry))
    }
}

impl NodeMetadata for InMemoryNodeStore {
    fn has_fingerprints(&self, node: &NodeRef) -> FingerprintResult<bool> {
        self.with_entry(node, |entry| entry.fingerprints.is_some())
    }

    fn fingerprints(&self, node: &NodeRef) -> FingerprintResult<Option<Vec<String>>> {
        self.with_entry(node, |entry| entry.fingerprints.clone())
    }

    fn set_fingerprints(&self, node: &NodeRef, encoded: Vec<String>) -> FingerprintResult<()> {
        self.with_entry(node, |entry| entry.fingerprints = Some(encoded))
    }

    fn remove_fingerprints(&self, node: &NodeRef) -> FingerprintResult<()> {
        self.with_entry(node, |entry| entry.fingerprints = None)
    }
}

/// [`ContentSource`] that reads node content out of a content store.
#[derive(Debug, Clone)]
pub struct StoreContentSource {
    nodes: Arc<InMemoryNodeStore>,
    store: Arc<ContentAddressStore>,
}

impl StoreContentSource {
    pub fn new(nodes: Arc<InMemoryNodeStore>, store: Arc<ContentAddressStore>) -> Self {
        Self { nodes, store }
    }
}

impl ContentSource for StoreContentSource {
    fn open_content(
        &self,
        node: &NodeRef,
        property: &PropertyName,
    ) -> FingerprintResult<Box<dyn Read + Send>> {
        let data = self
            .nodes
            .content(node, property)?
            .ok_or_else(|| FingerprintError::NoContent {
                node: node.clone(),
                property: property.to_string(),
            })?;
        let reader = self.store.read(&data.locator)?;
        Ok(Box::new(reader))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dedup_store::{StoreConfig, Transaction};
    use std::io::Write;

    fn node() -> NodeRef {
        NodeRef::primary("n-1")
    }

    // -----------------------------------------------------------------------
    // InMemoryNodeStore
    // -----------------------------------------------------------------------

    #[test]
    fn create_node_once() {
        let nodes = InMemoryNodeStore::new();
        assert!(nodes.create_node(node()));
        assert!(!nodes.create_node(node()));
        assert!(nodes.contains(&node()));
    }

    #[test]
    fn unknown_node_is_an_error() {
        let nodes = InMemoryNodeStore::new();
        assert!(matches!(
            nodes.has_fingerprints(&node()),
            Err(FingerprintError::NodeNotFound(_))
        ));
        assert!(matches!(
            nodes.content(&node(), &PropertyName::content()),
            Err(FingerprintError::NodeNotFound(_))
        ));
    }

    #[test]
    fn fingerprint_marker_lifecycle() {
        let nodes = InMemoryNodeStore::new();
        nodes.create_node(node());
        assert!(!nodes.has_fingerprints(&node()).unwrap());
        nodes
            .set_fingerprints(&node(), vec!["p|SHA-1|00".into()])
            .unwrap();
        assert!(nodes.has_fingerprints(&node()).unwrap());
        assert_eq!(
            nodes.fingerprints(&node()).unwrap(),
            Some(vec!["p|SHA-1|00".to_string()])
        );
        nodes.remove_fingerprints(&node()).unwrap();
        assert!(!nodes.has_fingerprints(&node()).unwrap());
        assert_eq!(nodes.fingerprints(&node()).unwrap(), None);
    }

    #[test]
    fn set_content_reports_before_and_after() {
        let nodes = InMemoryNodeStore::new();
        nodes.create_node(node());
        let prop = PropertyName::content();
        let v1 = ContentData::new("store://aa/bb/cc/aabbcc01.bin".parse().unwrap(), 1);
        let v2 = ContentData::new("store://aa/bb/cc/aabbcc02.bin".parse().unwrap(), 2);

        let first = nodes.set_content(&node(), &prop, v1.clone()).unwrap();
        assert_eq!(first.before, None);
        assert_eq!(first.after.as_ref(), Some(&v1));

        let second = nodes.set_content(&node(), &prop, v2.clone()).unwrap();
        assert_eq!(second.before, Some(v1));
        assert_eq!(nodes.content(&node(), &prop).unwrap(), Some(v2.clone()));

        let removed = nodes.remove_content(&node(), &prop).unwrap();
        assert_eq!(removed.before, Some(v2));
        assert_eq!(removed.after, None);
    }

    // -----------------------------------------------------------------------
    // StoreContentSource
    // -----------------------------------------------------------------------

    #[test]
    fn store_source_reads_node_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ContentAddressStore::open(StoreConfig::new(dir.path())).unwrap());
        let nodes = Arc::new(InMemoryNodeStore::new());
        nodes.create_node(node());

        let mut txn = Transaction::begin();
        let mut session = store.open_write_session(None).unwrap();
        session.write_all(b"node body").unwrap();
        session.close(&mut txn).unwrap();
        txn.commit();
        nodes
            .set_content(&node(), &PropertyName::content(), session.content_data())
            .unwrap();

        let source = StoreContentSource::new(nodes.clone(), store.clone());
        let mut reader = source.open_content(&node(), &PropertyName::content()).unwrap();
        let mut body = Vec::new();
        reader.read_to_end(&mut body).unwrap();
        assert_eq!(body, b"node body");
    }

    #[test]
    fn store_source_without_content_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ContentAddressStore::open(StoreConfig::new(dir.path())).unwrap());
        let nodes = Arc::new(InMemoryNodeStore::new());
        nodes.create_node(node());
        let source = StoreContentSource::new(nodes, store);
        assert!(matches!(
            source.open_content(&node(), &PropertyName::content()),
            Err(FingerprintError::NoContent { .. })
        ));
    }
}
