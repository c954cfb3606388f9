use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

use crate::is_false;

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlluxioRuntimeSpec {
    /// The version information that instructs fluid to orchestrate a particular version of Alluxio
    pub alluxio_version: VersionSpec,

    pub master: AlluxioCompTemplateSpec,

    pub job_master: AlluxioCompTemplateSpec,

    pub worker: AlluxioCompTemplateSpec,

    pub job_worker: AlluxioCompTemplateSpec,

    pub api_gateway: AlluxioCompTemplateSpec,

    pub fuse: AlluxioFuseSpec,

    /// Configurable properties for Alluxio system
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub jvm_options: Vec<String>,

    #[serde(rename = "tieredstore")]
    pub tiered_store: TieredStore,

    /// Management strategies for the dataset to which the runtime is bound
    pub data: Data,

    /// The replicas of the worker
    pub replicas: i32,

    #[serde(skip_serializing_if = "is_false")]
    pub disable_prometheus: bool,

    /// Name of the configMap holding HDFS configuration files
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hadoop_config: String,
}

impl AlluxioRuntimeSpec {
    /// replicas of the runtime worker
    pub fn replicas(&self) -> i32 {
        self.replicas
    }
}

#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VersionSpec {
    pub image: String,
    pub image_tag: String,
    pub image_pull_policy: String,
}

/// Template of an Alluxio component (master, worker, job roles, api gateway)
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlluxioCompTemplateSpec {
    /// desired number of replicas, defaults to 1 when unspecified
    pub replicas: i32,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub jvm_options: Vec<String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,

    /// Ports used by Alluxio, e.g. `rpc: 19998` for master
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub ports: BTreeMap<String, i32>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// only honored by the api gateway
    #[serde(skip_serializing_if = "is_false")]
    pub enabled: bool,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,

    pub network_mode: NetworkMode,
}

#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlluxioFuseSpec {
    pub image: String,
    pub image_tag: String,
    /// One of `Always`, `IfNotPresent`, `Never`
    pub image_pull_policy: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub jvm_options: Vec<String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// deploy the fuse client on every node selected by `node_selector`
    #[serde(skip_serializing_if = "is_false")]
    pub global: bool,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,

    pub clean_policy: FuseCleanPolicy,

    pub network_mode: NetworkMode,
}

#[derive(Default, Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum NetworkMode {
    #[default]
    #[serde(rename = "")]
    Default,
    HostNetwork,
    ContainerNetwork,
}

#[derive(Default, Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum FuseCleanPolicy {
    OnDemand,
    #[default]
    OnRuntimeDeleted,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TieredStore {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub levels: Vec<Level>,
}

/// One cache tier
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Level {
    #[serde(rename = "mediumtype")]
    pub medium_type: MediumType,

    pub volume_type: VolumeType,

    /// comma separated list of paths, e.g. `/mnt/cache1,/mnt/cache2`
    pub path: String,

    /// quota for the whole tier, e.g. `100Gi`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<String>,

    /// per path quotas, same order as `path`
    #[serde(skip_serializing_if = "String::is_empty")]
    pub quota_list: String,

    /// high watermark ratio, e.g. `0.9`
    #[serde(skip_serializing_if = "String::is_empty")]
    pub high: String,

    /// low watermark ratio, e.g. `0.7`
    #[serde(skip_serializing_if = "String::is_empty")]
    pub low: String,
}

impl Level {
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.path.split(',').map(str::trim).filter(|p| !p.is_empty())
    }
}

#[derive(Default, Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum MediumType {
    #[default]
    #[serde(rename = "MEM")]
    Memory,
    #[serde(rename = "SSD")]
    Ssd,
    #[serde(rename = "HDD")]
    Hdd,
}

#[derive(Default, Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VolumeType {
    #[default]
    HostPath,
    EmptyDir,
}

#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Data {
    /// copies of the dataset
    pub replicas: i32,
    pub pin: bool,
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn test_runtime_manifest() {
        let spec: AlluxioRuntimeSpec = serde_yaml::from_str(
            r#"
replicas: 2
master:
  replicas: 1
  ports:
    rpc: 19998
fuse:
  global: true
  cleanPolicy: OnDemand
tieredstore:
  levels:
    - mediumtype: SSD
      path: /mnt/cache1, /mnt/cache2
      quotaList: 100Gi,50Gi
      high: "0.95"
      low: "0.7"
"#,
        )
        .expect("parse");

        assert_eq!(spec.replicas(), 2);
        assert_eq!(spec.master.ports.get("rpc"), Some(&19998));
        assert!(spec.fuse.global);
        assert_eq!(spec.fuse.clean_policy, FuseCleanPolicy::OnDemand);

        let level = &spec.tiered_store.levels[0];
        assert_eq!(level.medium_type, MediumType::Ssd);
        assert_eq!(level.volume_type, VolumeType::HostPath);
        assert_eq!(level.paths().collect::<Vec<_>>(), vec!["/mnt/cache1", "/mnt/cache2"]);
    }
}
