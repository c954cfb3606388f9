//!
//! # Deployment
//!
//! Minimal view of the workload running an engine controller.
//! Only replica counts matter to the dataset controller.
//!
use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Deserialize};

use crate::core::{Spec, Status};

#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeploymentSpec {
    pub replicas: Option<i32>,
    #[serde(skip_serializing_if = "LabelSelector::is_empty")]
    pub selector: LabelSelector,
}

impl DeploymentSpec {
    /// desired replicas, absent means one replica
    pub fn desired_replicas(&self) -> i32 {
        self.replicas.unwrap_or(1)
    }
}

#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabelSelector {
    pub match_labels: BTreeMap<String, String>,
}

impl LabelSelector {
    pub fn is_empty(&self) -> bool {
        self.match_labels.is_empty()
    }
}

#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeploymentStatus {
    pub replicas: i32,
    pub ready_replicas: i32,
    pub available_replicas: i32,
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{} ready", self.ready_replicas, self.replicas)
    }
}

impl Spec for DeploymentSpec {
    const LABEL: &'static str = "Deployment";

    type Status = DeploymentStatus;
}

impl Status for DeploymentStatus {}
