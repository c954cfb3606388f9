use std::fmt;

use serde::{Serialize, Deserialize};

/// Observed state of a runtime, mirrored per role by the engine controller
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeStatus {
    pub master_phase: RuntimePhase,
    pub worker_phase: RuntimePhase,
    pub fuse_phase: RuntimePhase,

    pub desired_master_number_scheduled: i32,
    pub master_number_ready: i32,
    pub desired_worker_number_scheduled: i32,
    pub worker_number_ready: i32,
    pub desired_fuse_number_scheduled: i32,
    pub fuse_number_ready: i32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_gateway: Option<ApiGatewayStatus>,
}

impl fmt::Display for RuntimeStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "master: {}, worker: {}, fuse: {}",
            self.master_phase, self.worker_phase, self.fuse_phase
        )
    }
}

#[derive(Default, Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum RuntimePhase {
    #[default]
    #[serde(rename = "")]
    None,
    NotReady,
    PartialReady,
    Ready,
}

impl fmt::Display for RuntimePhase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::NotReady => write!(f, "NotReady"),
            Self::PartialReady => write!(f, "PartialReady"),
            Self::Ready => write!(f, "Ready"),
        }
    }
}

#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiGatewayStatus {
    pub endpoint: String,
}
