use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatasetStatus {
    /// Dataset phase, only written by the dataset controller and engine controllers
    pub phase: DatasetPhase,

    /// Lifecycle log, most recent last.
    /// `None` until the dataset controller initializes it.
    pub conditions: Option<Vec<DatasetCondition>>,

    /// Runtimes bound to the dataset
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub runtimes: Vec<RuntimeRef>,

    /// Total size of the underlying file system
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ufs_total: String,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub cache_states: BTreeMap<String, String>,
}

impl fmt::Display for DatasetStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.phase)
    }
}

impl DatasetStatus {
    /// append condition to the end of the log
    pub fn append_condition(&mut self, condition: DatasetCondition) {
        self.conditions.get_or_insert_with(Vec::new).push(condition);
    }

    /// latest condition of given type
    pub fn last_condition(&self, condition_type: DatasetConditionType) -> Option<&DatasetCondition> {
        self.conditions
            .as_ref()?
            .iter()
            .rev()
            .find(|c| c.condition_type == condition_type)
    }

    /// engine type of first bound runtime
    pub fn bound_engine(&self) -> Option<&str> {
        self.runtimes
            .iter()
            .map(|r| r.engine_type.as_str())
            .find(|t| !t.is_empty())
    }
}

#[derive(Default, Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum DatasetPhase {
    /// Newly created, not yet seen by the controller
    #[default]
    #[serde(rename = "")]
    None,
    NotBound,
    Bound,
    Pending,
    Failed,
}

impl fmt::Display for DatasetPhase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::NotBound => write!(f, "NotBound"),
            Self::Bound => write!(f, "Bound"),
            Self::Pending => write!(f, "Pending"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetCondition {
    #[serde(rename = "type")]
    pub condition_type: DatasetConditionType,
    pub status: ConditionStatus,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
    pub last_update_time: DateTime<Utc>,
    pub last_transition_time: DateTime<Utc>,
}

impl DatasetCondition {
    pub fn new(
        condition_type: DatasetConditionType,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            condition_type,
            status,
            reason: reason.into(),
            message: message.into(),
            last_update_time: now,
            last_transition_time: now,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum DatasetConditionType {
    Ready,
    NotReady,
    Initialized,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

/// reference to runtime bound to dataset
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeRef {
    pub name: String,
    pub namespace: String,
    /// e.g. `Accelerate`
    pub category: String,
    /// engine type tag, e.g. `alluxio`
    #[serde(rename = "type")]
    pub engine_type: String,
}
