use std::time::Duration;

use fluid_controlplane_metadata::core::NamespacedName;
use fluid_stream_dispatcher::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("{kind} '{key}' was modified concurrently")]
    Conflict {
        kind: &'static str,
        key: NamespacedName,
    },
    #[error("store error: {0}")]
    Store(StoreError),
    #[error("reconcile of '{key}' cancelled after {timeout:?}")]
    Cancelled {
        key: NamespacedName,
        timeout: Duration,
    },
}

impl From<StoreError> for ReconcileError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { kind, key, .. } => Self::Conflict { kind, key },
            other => Self::Store(other),
        }
    }
}

impl ReconcileError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
