pub mod memory;
pub mod local;

use std::fmt;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use fluid_controlplane_metadata::core::{Spec, MetadataObject, NamespacedName};

use crate::StoreError;

pub type SharedClient<C> = std::sync::Arc<C>;

/// scope of list and watch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameSpace {
    All,
    Named(String),
}

impl NameSpace {
    pub fn contains(&self, namespace: &str) -> bool {
        match self {
            Self::All => true,
            Self::Named(name) => name == namespace,
        }
    }
}

impl From<Option<String>> for NameSpace {
    fn from(namespace: Option<String>) -> Self {
        match namespace {
            Some(name) => Self::Named(name),
            None => Self::All,
        }
    }
}

impl fmt::Display for NameSpace {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::All => write!(f, "*"),
            Self::Named(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetadataStoreList<S: Spec> {
    /// store version at time of listing
    pub version: String,
    pub items: Vec<MetadataObject<S>>,
}

/// change notification
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent<S: Spec> {
    Added(MetadataObject<S>),
    Modified(MetadataObject<S>),
    Deleted(MetadataObject<S>),
}

impl<S: Spec> WatchEvent<S> {
    pub fn object(&self) -> &MetadataObject<S> {
        match self {
            Self::Added(obj) | Self::Modified(obj) | Self::Deleted(obj) => obj,
        }
    }

    pub fn key(&self) -> NamespacedName {
        self.object().key()
    }
}

/// Access to objects in the cluster object store.
///
/// Writes are guarded by optimistic concurrency: `update_item` and `update_status`
/// fail with [`StoreError::Conflict`] when the resource version of the passed object
/// is not the current one. An empty resource version writes unconditionally.
#[async_trait]
pub trait MetadataClient: Send + Sync {
    async fn retrieve_item<S>(&self, key: &NamespacedName) -> Result<MetadataObject<S>, StoreError>
    where
        S: Spec;

    async fn retrieve_items<S>(
        &self,
        namespace: &NameSpace,
    ) -> Result<MetadataStoreList<S>, StoreError>
    where
        S: Spec;

    async fn create_item<S>(&self, value: MetadataObject<S>) -> Result<MetadataObject<S>, StoreError>
    where
        S: Spec;

    /// replace metadata and spec, status is left untouched
    async fn update_item<S>(&self, value: MetadataObject<S>) -> Result<MetadataObject<S>, StoreError>
    where
        S: Spec;

    /// replace status only, never changes generation
    async fn update_status<S>(
        &self,
        value: MetadataObject<S>,
    ) -> Result<MetadataObject<S>, StoreError>
    where
        S: Spec;

    /// request deletion, objects holding finalizers are only marked for deletion
    async fn delete_item<S>(&self, key: &NamespacedName) -> Result<(), StoreError>
    where
        S: Spec;

    /// stream changes newer than resource version
    fn watch_stream_since<S>(
        &self,
        namespace: &NameSpace,
        resource_version: Option<String>,
    ) -> BoxStream<'_, Result<Vec<WatchEvent<S>>, StoreError>>
    where
        S: Spec;
}
