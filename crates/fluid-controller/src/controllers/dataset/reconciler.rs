//!
//! # Dataset reconciler
//!
//! One level triggered pass over a dataset:
//! activate the engine controller, load the dataset, then either release a
//! terminating dataset or advance a new one to `NotBound`.
//!
use tracing::{debug, info, warn, instrument};

use fluid_controlplane_metadata::constants::ERROR_DELETE_DATASET;
use fluid_controlplane_metadata::core::NamespacedName;
use fluid_controlplane_metadata::dataset::{DatasetPhase, DatasetSpec};
use fluid_controlplane_metadata::event::EventType;
use fluid_stream_dispatcher::metadata::MetadataClient;

use crate::core::SharedContext;
use crate::events::object_reference;

use super::{ReconcileError, ReconcileRequest, Requeue};

pub struct DatasetReconciler<C> {
    ctx: SharedContext<C>,
}

impl<C> DatasetReconciler<C>
where
    C: MetadataClient + 'static,
{
    pub fn new(ctx: SharedContext<C>) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self), fields(dataset = %key))]
    pub async fn reconcile(&self, key: &NamespacedName) -> Result<Requeue, ReconcileError> {
        let needs_requeue = match self.ctx.activator().ensure_active(key).await {
            Ok(activation) => {
                if activation.scaled_up {
                    debug!(controller = %activation.controller, "scaled out engine controller on demand");
                } else {
                    info!(controller = %activation.controller, "engine controller already scaled");
                }
                false
            }
            Err(err) => {
                info!("not able to scale out engine controller: {err}");
                true
            }
        };

        let dataset = match self.ctx.client().retrieve_item::<DatasetSpec>(key).await {
            Ok(dataset) => dataset,
            Err(err) if err.is_not_found() => {
                debug!("dataset not found");
                return Ok(Requeue::None);
            }
            Err(err) => return Err(err.into()),
        };

        let request = ReconcileRequest::new(key.clone(), dataset, needs_requeue);
        if request.is_being_deleted() {
            self.reconcile_deletion(&request).await
        } else {
            self.reconcile_phase(&request).await
        }
    }

    /// release the finalizer once nothing uses the dataset
    async fn reconcile_deletion(&self, request: &ReconcileRequest) -> Result<Requeue, ReconcileError> {
        let key = request.key();
        let dataset = request.dataset();
        let config = self.ctx.config();

        if let Err(err) = self.ctx.usage().check_in_use(&key.name, &key.namespace).await {
            warn!("failed to delete dataset: {err}");
            self.ctx
                .recorder()
                .record(
                    object_reference(dataset),
                    EventType::Warning,
                    ERROR_DELETE_DATASET,
                    &format!("Failed to delete dataset because err: {err}"),
                )
                .await;
            return Ok(Requeue::After(config.deletion_retry_delay));
        }

        if !dataset.metadata.has_finalizer(&config.finalizer) {
            debug!("finalizer not attached, nothing to release");
            return Ok(Requeue::None);
        }

        let mut released = dataset.clone();
        released.metadata.remove_finalizer(&config.finalizer);
        match self.ctx.client().update_item(released).await {
            Ok(_) => info!("finalizer removed"),
            Err(err) if err.is_not_found() => debug!("dataset already removed"),
            Err(err) => return Err(err.into()),
        }

        Ok(Requeue::None)
    }

    /// attach finalizer, then move a new dataset to `NotBound`
    async fn reconcile_phase(&self, request: &ReconcileRequest) -> Result<Requeue, ReconcileError> {
        let dataset = request.dataset();
        let config = self.ctx.config();

        if !dataset.metadata.has_finalizer(&config.finalizer) {
            let observed = dataset.metadata.generation;
            let mut updated = dataset.clone();
            updated.metadata.add_finalizer(&config.finalizer);
            let persisted = self.ctx.client().update_item(updated).await?;
            info!(generation = persisted.metadata.generation, "finalizer added");

            return Ok(if persisted.metadata.generation != observed {
                Requeue::Immediate
            } else {
                Requeue::resync_if(request.needs_requeue(), config.resync_period)
            });
        }

        if dataset.status.phase == DatasetPhase::None {
            let mut updated = dataset.clone();
            updated.status.phase = DatasetPhase::NotBound;
            updated.status.conditions.get_or_insert_with(Vec::new);
            self.ctx.client().update_status(updated).await?;
            info!(phase = %DatasetPhase::NotBound, "phase updated");
        } else {
            self.ctx.phase_observer().observe(request).await?;
        }

        Ok(Requeue::resync_if(request.needs_requeue(), config.resync_period))
    }
}
