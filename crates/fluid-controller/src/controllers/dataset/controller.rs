//!
//! # Dataset Controller
//!
//! Pool of workers draining the dataset work queue. Each key is reconciled under a
//! deadline and rescheduled according to the outcome.
//!
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, info, warn, instrument};

use fluvio_future::task::spawn;
use fluvio_future::timer::sleep;

use fluid_controlplane_metadata::core::NamespacedName;
use fluid_stream_dispatcher::metadata::MetadataClient;
use fluid_stream_dispatcher::queue::WorkQueue;

use crate::core::SharedContext;

use super::{DatasetReconciler, ReconcileError, Requeue};

pub struct DatasetController<C> {
    reconciler: Arc<DatasetReconciler<C>>,
    queue: WorkQueue<NamespacedName>,
    timeout: Duration,
}

impl<C> DatasetController<C>
where
    C: MetadataClient + 'static,
{
    /// spawn configured number of workers
    pub fn start(ctx: SharedContext<C>, queue: WorkQueue<NamespacedName>) {
        let workers = ctx.config().workers;
        let timeout = ctx.config().reconcile_timeout;
        let reconciler = Arc::new(DatasetReconciler::new(ctx));

        info!(workers, "starting dataset controller");
        for id in 0..workers {
            let controller = Self {
                reconciler: reconciler.clone(),
                queue: queue.clone(),
                timeout,
            };
            spawn(controller.dispatch_loop(id));
        }
    }

    #[instrument(skip(self), name = "DatasetController")]
    async fn dispatch_loop(self, worker: usize) {
        info!("started");
        while let Some(key) = self.queue.get().await {
            let result = self.reconcile_with_deadline(&key).await;
            self.schedule(&key, result).await;
            self.queue.done(&key).await;
        }
        info!("queue shut down, terminated");
    }

    async fn reconcile_with_deadline(&self, key: &NamespacedName) -> Result<Requeue, ReconcileError> {
        use tokio::select;

        select! {
            result = self.reconciler.reconcile(key) => result,
            _ = sleep(self.timeout) => Err(ReconcileError::Cancelled {
                key: key.clone(),
                timeout: self.timeout,
            }),
        }
    }

    async fn schedule(&self, key: &NamespacedName, result: Result<Requeue, ReconcileError>) {
        match result {
            Ok(requeue) => {
                trace!(dataset = %key, %requeue, "reconciled");
                self.queue.forget(key).await;
                match requeue {
                    Requeue::None => {}
                    Requeue::Immediate => self.queue.add(key.clone()).await,
                    Requeue::After(delay) => self.queue.add_after(key.clone(), delay),
                }
            }
            Err(err) => {
                if err.is_conflict() {
                    debug!(dataset = %key, "{err}");
                } else {
                    warn!(dataset = %key, "reconcile failed: {err}");
                }
                self.queue.add_rate_limited(key.clone()).await;
            }
        }
    }
}
