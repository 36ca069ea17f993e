use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Namespace of the host's built-in content model.
pub const CONTENT_MODEL_NAMESPACE: &str = "urn:dedup:model:content:1.0";

/// Identifies one of the host's node stores.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StoreRef {
    pub protocol: String,
    pub identifier: String,
}

impl StoreRef {
    pub fn new(protocol: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            identifier: identifier.into(),
        }
    }

    /// The primary content store. Fingerprints are only maintained for nodes
    /// living here; version and archive stores are excluded.
    pub fn primary() -> Self {
        Self::new("workspace", "SpacesStore")
    }

    pub fn is_primary(&self) -> bool {
        self.protocol == "workspace" && self.identifier == "SpacesStore"
    }
}

impl fmt::Display for StoreRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.protocol, self.identifier)
    }
}

/// Reference to a host node: `protocol://identifier/id`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeRef {
    pub store: StoreRef,
    pub id: String,
}

impl NodeRef {
    pub fn new(store: StoreRef, id: impl Into<String>) -> Self {
        Self { store, id: id.into() }
    }

    /// A node in the primary content store.
    pub fn primary(id: impl Into<String>) -> Self {
        Self::new(StoreRef::primary(), id)
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.store, self.id)
    }
}

impl FromStr for NodeRef {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TypeError::InvalidNodeRef(s.to_string());
        let (protocol, rest) = s.split_once("://").ok_or_else(invalid)?;
        let (identifier, id) = rest.split_once('/').ok_or_else(invalid)?;
        if protocol.is_empty() || identifier.is_empty() || id.is_empty() || id.contains('/') {
            return Err(invalid());
        }
        Ok(Self::new(StoreRef::new(protocol, identifier), id))
    }
}

/// Qualified name of a node property, displayed as `{namespace}local`.
///
/// Property names end up inside `|`-delimited fingerprint records, so the
/// `|` character is rejected in both parts.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PropertyName {
    namespace: String,
    local: String,
    /// Written as `{namespace}local` even when the namespace is empty.
    braced: bool,
}

impl PropertyName {
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Result<Self, TypeError> {
        let namespace = namespace.into();
        let local = local.into();
        let invalid = |reason: &str| TypeError::InvalidPropertyName {
            name: format!("{{{namespace}}}{local}"),
            reason: reason.to_string(),
        };
        if local.is_empty() {
            return Err(invalid("empty local name"));
        }
        if namespace.contains('|') || local.contains('|') {
            return Err(invalid("contains '|'"));
        }
        if namespace.contains(['{', '}']) || local.contains(['{', '}']) {
            return Err(invalid("contains a brace"));
        }
        Ok(Self {
            namespace,
            local,
            braced: true,
        })
    }

    /// A name without namespace, written as the bare local name.
    pub fn unqualified(local: impl Into<String>) -> Result<Self, TypeError> {
        let mut name = Self::new("", local)?;
        name.braced = false;
        Ok(name)
    }

    /// The default content property of a node.
    pub fn content() -> Self {
        Self {
            namespace: CONTENT_MODEL_NAMESPACE.to_string(),
            local: "content".to_string(),
            braced: true,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn local_name(&self) -> &str {
        &self.local
    }
}

impl fmt::Debug for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyName({self})")
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.braced {
            f.write_str(&self.local)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local)
        }
    }
}

impl FromStr for PropertyName {
    type Err = TypeError;

    /// Accepts `{namespace}local` or a bare `local` name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix('{') {
            Some(rest) => {
                let (namespace, local) =
                    rest.split_once('}')
                        .ok_or_else(|| TypeError::InvalidPropertyName {
                            name: s.to_string(),
                            reason: "unterminated namespace".into(),
                        })?;
                Self::new(namespace, local)
            }
            None => Self::unqualified(s),
        }
    }
}

impl TryFrom<String> for PropertyName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PropertyName> for String {
    fn from(name: PropertyName) -> Self {
        name.to_string()
    }
}
