use async_trait::async_trait;
use tracing::debug;

use super::{ReconcileError, ReconcileRequest};

/// Hook for phases past `NotBound`, which are driven by engine controllers.
/// Only called for datasets that are not terminating.
#[async_trait]
pub trait PhaseObserver: Send + Sync {
    async fn observe(&self, request: &ReconcileRequest) -> Result<(), ReconcileError>;
}

/// leaves the phase to the engine controller
#[derive(Debug, Default)]
pub struct EnginePhaseObserver;

#[async_trait]
impl PhaseObserver for EnginePhaseObserver {
    async fn observe(&self, request: &ReconcileRequest) -> Result<(), ReconcileError> {
        debug!(
            dataset = %request.key(),
            phase = %request.dataset().status.phase,
            "phase owned by engine controller"
        );
        Ok(())
    }
}
