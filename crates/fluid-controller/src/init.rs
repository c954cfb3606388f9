//!
//! # Initialization routines for Dataset Controller
//!
//! Dispatchers and workers are hooked up here around a single work queue.
//!
use std::sync::Arc;

use tracing::info;

use fluid_controlplane_metadata::core::NamespacedName;
use fluid_controlplane_metadata::dataset::DatasetSpec;
use fluid_controlplane_metadata::runtime::AlluxioRuntimeSpec;
use fluid_stream_dispatcher::dispatcher::ChangeDispatcher;
use fluvio_types::event::StickyEvent;
use fluid_stream_dispatcher::metadata::MetadataClient;
use fluid_stream_dispatcher::queue::WorkQueue;

use crate::controllers::dataset::DatasetController;
use crate::core::SharedContext;

/// handle to running controllers
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    queue: WorkQueue<NamespacedName>,
    shutdown: Arc<StickyEvent>,
}

impl ControllerHandle {
    /// stop dispatchers and let workers drain the queue
    pub fn shutdown(&self) {
        info!("shutting down controllers");
        self.shutdown.notify();
        self.queue.shutdown();
    }

    pub async fn wait_for_shutdown(&self) {
        self.shutdown.listen().await;
    }
}

/// start the main loop
pub fn start_main_loop<C>(ctx: SharedContext<C>) -> ControllerHandle
where
    C: MetadataClient + 'static,
{
    let config = ctx.config();
    let queue = WorkQueue::new(config.backoff());
    let shutdown = StickyEvent::shared();

    whitelist!(config, "dataset", {
        ChangeDispatcher::<DatasetSpec, C>::new(
            ctx.client().clone(),
            config.scope(),
            queue.clone(),
            shutdown.clone(),
        )
        .start();
        DatasetController::start(ctx.clone(), queue.clone());
    });

    // runtime shares namespace and name with its dataset
    whitelist!(
        config,
        "runtime",
        ChangeDispatcher::<AlluxioRuntimeSpec, C>::new(
            ctx.client().clone(),
            config.scope(),
            queue.clone(),
            shutdown.clone(),
        )
        .start()
    );

    ControllerHandle { queue, shutdown }
}
