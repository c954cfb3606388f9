use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

use crate::is_false;

/// Dataset is a logical data source that a user wants cached
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatasetSpec {
    /// Mount points to be mounted on the cache runtime
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mounts: Vec<Mount>,

    /// The owner of the dataset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<User>,

    /// Whether the dataset may share nodes with other datasets
    pub placement: PlacementMode,
}

#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Mount {
    /// Underlying storage path, e.g. `hdfs://namenode:9000/data`
    pub mount_point: String,

    /// The name of the mount, unique within the dataset
    pub name: String,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "is_false")]
    pub read_only: bool,

    #[serde(skip_serializing_if = "is_false")]
    pub shared: bool,
}

#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub uid: Option<i64>,
    pub gid: Option<i64>,
    pub user: String,
    pub group: String,
}

#[derive(Default, Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum PlacementMode {
    #[default]
    Exclusive,
    Shared,
}
