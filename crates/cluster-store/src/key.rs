//! Object identities

use crate::error::StoreError;
use kube::Resource;
use kube::api::ObjectMeta;
use std::fmt;

/// Namespace + name identity of a namespaced object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    /// Namespace of the object
    pub namespace: String,
    /// Name of the object
    pub name: String,
}

impl ObjectKey {
    /// Create a key from a namespace and a name.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of an object from its metadata, if both namespace and name are set.
    pub fn from_meta(meta: &ObjectMeta) -> Option<Self> {
        Some(Self::new(meta.namespace.clone()?, meta.name.clone()?))
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Object kinds the store knows how to read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// `CassandraCluster` custom resource
    CassandraCluster,
    /// Core `Service`
    Service,
    /// `apps/v1` `StatefulSet`
    StatefulSet,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::CassandraCluster => "CassandraCluster",
            Self::Service => "Service",
            Self::StatefulSet => "StatefulSet",
        };
        f.write_str(kind)
    }
}

/// Key of an object about to be written, rejecting objects without identity.
pub(crate) fn key_of<K: Resource>(kind: ResourceKind, object: &K) -> Result<ObjectKey, StoreError> {
    ObjectKey::from_meta(object.meta()).ok_or_else(|| StoreError::InvalidObject {
        kind,
        reason: "metadata.namespace and metadata.name are required".to_string(),
    })
}
