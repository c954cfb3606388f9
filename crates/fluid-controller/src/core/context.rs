//!
//! # Controller context
//!
//! Store client, configuration and collaborators shared by all controllers.
//!
use std::fmt;
use std::sync::Arc;

use fluid_stream_dispatcher::metadata::{MetadataClient, SharedClient};

use crate::activation::{ActivationRegistry, EngineActivator};
use crate::config::DatasetControllerConfig;
use crate::controllers::dataset::{EnginePhaseObserver, PhaseObserver};
use crate::events::{DATASET_CONTROLLER_COMPONENT, EventRecorder, StoreEventRecorder};
use crate::usage::{UsageChecker, VolumeClaimUsage};

pub type SharedContext<C> = Arc<Context<C>>;

pub struct Context<C> {
    client: SharedClient<C>,
    config: DatasetControllerConfig,
    activator: Arc<dyn EngineActivator>,
    usage: Arc<dyn UsageChecker>,
    recorder: Arc<dyn EventRecorder>,
    phase_observer: Arc<dyn PhaseObserver>,
}

impl<C> fmt::Debug for Context<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .finish()
    }
}

impl<C> Context<C>
where
    C: MetadataClient + 'static,
{
    /// context with store backed collaborators
    pub fn new(config: DatasetControllerConfig, client: SharedClient<C>) -> Self {
        Self {
            activator: Arc::new(ActivationRegistry::from_config(client.clone(), &config)),
            usage: Arc::new(VolumeClaimUsage::new(client.clone())),
            recorder: Arc::new(StoreEventRecorder::new(
                client.clone(),
                DATASET_CONTROLLER_COMPONENT,
            )),
            phase_observer: Arc::new(EnginePhaseObserver),
            client,
            config,
        }
    }

    pub fn with_activator(mut self, activator: Arc<dyn EngineActivator>) -> Self {
        self.activator = activator;
        self
    }

    pub fn with_usage_checker(mut self, usage: Arc<dyn UsageChecker>) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_recorder(mut self, recorder: Arc<dyn EventRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn with_phase_observer(mut self, phase_observer: Arc<dyn PhaseObserver>) -> Self {
        self.phase_observer = phase_observer;
        self
    }

    pub fn shared(self) -> SharedContext<C> {
        Arc::new(self)
    }
}

impl<C> Context<C> {
    pub fn client(&self) -> &SharedClient<C> {
        &self.client
    }

    pub fn config(&self) -> &DatasetControllerConfig {
        &self.config
    }

    pub fn activator(&self) -> &Arc<dyn EngineActivator> {
        &self.activator
    }

    pub fn usage(&self) -> &Arc<dyn UsageChecker> {
        &self.usage
    }

    pub fn recorder(&self) -> &Arc<dyn EventRecorder> {
        &self.recorder
    }

    pub fn phase_observer(&self) -> &Arc<dyn PhaseObserver> {
        &self.phase_observer
    }
}
