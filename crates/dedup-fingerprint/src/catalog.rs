use std::fmt;

use dedup_crypto::digest_reader;
use dedup_types::NodeRef;
use tracing::{debug, trace};

use crate::config::FingerprintAlgorithms;
use crate::error::FingerprintResult;
use crate::record::FingerprintRecord;
use crate::set::FingerprintSet;
use crate::traits::{ContentPropertyUpdate, ContentSource, NodeMetadata};

/// What a content-property update did to a node's fingerprints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CatalogOutcome {
    /// The node is outside the primary store; nothing was touched.
    Skipped,
    /// The node's fingerprints were replaced with this set.
    Updated(FingerprintSet),
    /// No fingerprints remained and the node's marker was removed.
    Cleared,
    /// No fingerprints before or after; nothing was written.
    Unchanged,
}

/// Keeps each node's fingerprint records in step with its content.
///
/// When a property's content changes, every record for that property is
/// discarded and one new record per configured algorithm is computed from
/// the new content. Records for other properties are left untouched. Only
/// nodes of the primary store are fingerprinted.
pub struct FingerprintCatalog<M, C> {
    metadata: M,
    content: C,
    algorithms: FingerprintAlgorithms,
}

impl<M, C> fmt::Debug for FingerprintCatalog<M, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FingerprintCatalog")
            .field("algorithms", &self.algorithms)
            .finish_non_exhaustive()
    }
}

impl<M: NodeMetadata, C: ContentSource> FingerprintCatalog<M, C> {
    pub fn new(metadata: M, content: C, algorithms: FingerprintAlgorithms) -> Self {
        Self {
            metadata,
            content,
            algorithms,
        }
    }

    pub fn algorithms(&self) -> &FingerprintAlgorithms {
        &self.algorithms
    }

    /// React to a change of a content property.
    pub fn on_content_property_update(
        &self,
        update: &ContentPropertyUpdate,
    ) -> FingerprintResult<CatalogOutcome> {
        let ContentPropertyUpdate {
            node, property, after, ..
        } = update;

        if !node.store.is_primary() {
            trace!(%node, %property, "not a primary store node; skipping fingerprints");
            return Ok(CatalogOutcome::Skipped);
        }

        let had_fingerprints = self.metadata.has_fingerprints(node)?;
        let existing = if had_fingerprints {
            self.stored_set(node)?
        } else {
            FingerprintSet::new()
        };
        let mut set = existing.without_property(property);

        if after.is_some() {
            for algorithm in self.algorithms.iter() {
                let mut reader = self.content.open_content(node, property)?;
                let digest = digest_reader(algorithm, &mut reader)?;
                debug!(%node, %property, %algorithm, %digest, "computed fingerprint");
                set.insert(FingerprintRecord::new(property.clone(), algorithm, digest));
            }
        }

        if !set.is_empty() {
            self.metadata.set_fingerprints(node, set.encode())?;
            Ok(CatalogOutcome::Updated(set))
        } else if had_fingerprints {
            self.metadata.remove_fingerprints(node)?;
            debug!(%node, "fingerprints cleared");
            Ok(CatalogOutcome::Cleared)
        } else {
            Ok(CatalogOutcome::Unchanged)
        }
    }

    /// The node's current fingerprints; empty if it has none.
    pub fn fingerprints(&self, node: &NodeRef) -> FingerprintResult<FingerprintSet> {
        self.stored_set(node)
    }

    fn stored_set(&self, node: &NodeRef) -> FingerprintResult<FingerprintSet> {
        match self.metadata.fingerprints(node)? {
            Some(encoded) => FingerprintSet::decode(&encoded),
            None => Ok(FingerprintSet::new()),
        }
    }
}
