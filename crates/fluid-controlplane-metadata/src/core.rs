//!
//! # Core metadata
//!
//! Object metadata shared by every resource kind stored in the control plane.
//! Field names follow the Kubernetes wire shape so manifests can be loaded as-is.
//!
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Debug;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use serde::de::DeserializeOwned;

/// Resource kind stored in the metadata store
pub trait Spec:
    Serialize + DeserializeOwned + Debug + Default + Clone + PartialEq + Send + Sync + 'static
{
    const LABEL: &'static str;

    type Status: Status;
}

pub trait Status:
    Serialize + DeserializeOwned + Debug + Default + Clone + PartialEq + Send + Sync + 'static
{
}

/// identity of namespaced object, immutable for lifetime of object
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NamespacedName {
    pub namespace: String,
    pub name: String,
}

impl NamespacedName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid object key '{0}', expected <namespace>/<name>")]
pub struct InvalidKey(String);

impl FromStr for NamespacedName {
    type Err = InvalidKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((namespace, name)) if !namespace.is_empty() && !name.is_empty() => {
                Ok(Self::new(namespace, name))
            }
            _ => Err(InvalidKey(s.to_owned())),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uid: String,
    /// opaque store version, changes on every write
    #[serde(skip_serializing_if = "String::is_empty")]
    pub resource_version: String,
    /// bumped by the store on every non-status change
    pub generation: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub finalizers: Vec<String>,
}

impl ObjectMeta {
    pub fn new<S>(name: S, namespace: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    pub fn key(&self) -> NamespacedName {
        NamespacedName::new(self.namespace.clone(), self.name.clone())
    }

    /// object has been accepted for deletion but is held by finalizers
    pub fn is_being_deleted(&self) -> bool {
        self.deletion_timestamp.is_some()
    }

    pub fn has_finalizer(&self, finalizer: &str) -> bool {
        self.finalizers.iter().any(|f| f == finalizer)
    }

    /// append finalizer, return false if it was already present
    pub fn add_finalizer(&mut self, finalizer: &str) -> bool {
        if self.has_finalizer(finalizer) {
            false
        } else {
            self.finalizers.push(finalizer.to_owned());
            true
        }
    }

    /// remove exact finalizer token, other tokens are untouched
    pub fn remove_finalizer(&mut self, finalizer: &str) -> bool {
        let before = self.finalizers.len();
        self.finalizers.retain(|f| f != finalizer);
        before != self.finalizers.len()
    }
}

/// stored object: metadata, desired spec and observed status
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "S: Spec", rename_all = "camelCase")]
pub struct MetadataObject<S: Spec> {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: S,
    #[serde(default)]
    pub status: S::Status,
}

impl<S: Spec> MetadataObject<S> {
    pub fn new(metadata: ObjectMeta, spec: S) -> Self {
        Self {
            metadata,
            spec,
            status: S::Status::default(),
        }
    }

    pub fn with_status(mut self, status: S::Status) -> Self {
        self.status = status;
        self
    }

    pub fn key(&self) -> NamespacedName {
        self.metadata.key()
    }
}
