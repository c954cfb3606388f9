//!
//! # Engine controller activation
//!
//! Engine controllers are deployed with zero replicas and scaled up once a dataset
//! needs them. The engine serving a dataset is found through a registry keyed by
//! engine type tag.
//!
mod scaleout;

pub use scaleout::DeploymentScaleout;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace, warn};

use fluid_controlplane_metadata::core::NamespacedName;
use fluid_controlplane_metadata::dataset::DatasetSpec;
use fluid_controlplane_metadata::runtime::{AlluxioRuntimeSpec, RuntimeSpec};
use fluid_stream_dispatcher::StoreError;
use fluid_stream_dispatcher::metadata::{MetadataClient, SharedClient};

use crate::config::DatasetControllerConfig;

/// outcome of a successful activation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    /// identity of the engine controller, `<namespace>/<name>`
    pub controller: String,
    /// controller was scaled up by this call
    pub scaled_up: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ActivationError {
    #[error("no runtime bound to dataset {0}")]
    Unresolved(NamespacedName),
    #[error("engine '{0}' is not registered")]
    UnknownEngine(String),
    #[error("engine controller {0} not found")]
    ControllerNotFound(NamespacedName),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Ensure the controller of the engine serving a dataset is running
#[async_trait]
pub trait EngineActivator: Send + Sync {
    async fn ensure_active(&self, key: &NamespacedName) -> Result<Activation, ActivationError>;
}

/// Activation strategy of a single engine type
#[async_trait]
pub trait EngineActivation: Send + Sync {
    /// engine type tag
    fn engine(&self) -> &str;

    /// a runtime of this engine exists for the dataset
    async fn has_runtime(&self, key: &NamespacedName) -> Result<bool, StoreError>;

    async fn activate(&self, key: &NamespacedName) -> Result<Activation, ActivationError>;
}

/// builds the activation strategy of an engine from its controller deployment
type StrategyBuilder<C> = fn(SharedClient<C>, NamespacedName) -> Arc<dyn EngineActivation>;

fn deployment_scaleout<C, R>(
    client: SharedClient<C>,
    controller: NamespacedName,
) -> Arc<dyn EngineActivation>
where
    C: MetadataClient + 'static,
    R: RuntimeSpec,
{
    Arc::new(DeploymentScaleout::<C, R>::new(client, controller))
}

/// engine tags with a known runtime kind
fn known_engines<C>() -> BTreeMap<&'static str, StrategyBuilder<C>>
where
    C: MetadataClient + 'static,
{
    BTreeMap::from([(
        AlluxioRuntimeSpec::ENGINE,
        deployment_scaleout::<C, AlluxioRuntimeSpec> as StrategyBuilder<C>,
    )])
}

pub struct ActivationRegistry<C> {
    client: SharedClient<C>,
    engines: BTreeMap<String, Arc<dyn EngineActivation>>,
}

impl<C> fmt::Debug for ActivationRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ActivationRegistry")
            .field("engines", &self.engines.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<C> ActivationRegistry<C>
where
    C: MetadataClient + 'static,
{
    pub fn new(client: SharedClient<C>) -> Self {
        Self {
            client,
            engines: BTreeMap::new(),
        }
    }

    /// registry with a strategy for every configured engine with a known runtime kind
    pub fn from_config(client: SharedClient<C>, config: &DatasetControllerConfig) -> Self {
        let known = known_engines::<C>();
        let mut registry = Self::new(client.clone());
        for (engine, deployment) in &config.engines {
            let Some(strategy) = known.get(engine.as_str()) else {
                warn!(%engine, "no runtime kind known for engine, skipping");
                continue;
            };
            let controller =
                NamespacedName::new(config.controller_namespace.clone(), deployment.clone());
            registry.register(strategy(client.clone(), controller));
        }
        debug!(engines = ?registry.engines().collect::<Vec<_>>(), "engine registry");
        registry
    }

    /// register strategy, replacing any previous strategy of the same engine
    pub fn register(&mut self, strategy: Arc<dyn EngineActivation>) {
        let engine = strategy.engine().to_owned();
        debug!(%engine, "registering engine");
        self.engines.insert(engine, strategy);
    }

    pub fn engines(&self) -> impl Iterator<Item = &str> {
        self.engines.keys().map(String::as_str)
    }

    /// engine from dataset status, otherwise first engine with a runtime for the dataset
    async fn resolve(
        &self,
        key: &NamespacedName,
    ) -> Result<Arc<dyn EngineActivation>, ActivationError> {
        match self.client.retrieve_item::<DatasetSpec>(key).await {
            Ok(dataset) => {
                if let Some(engine) = dataset.status.bound_engine() {
                    trace!(engine, "engine bound in status");
                    return self
                        .engines
                        .get(engine)
                        .cloned()
                        .ok_or_else(|| ActivationError::UnknownEngine(engine.to_owned()));
                }
            }
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err.into()),
        }

        for (engine, strategy) in &self.engines {
            if strategy.has_runtime(key).await? {
                trace!(%engine, "runtime found");
                return Ok(strategy.clone());
            }
        }

        Err(ActivationError::Unresolved(key.clone()))
    }
}

#[async_trait]
impl<C> EngineActivator for ActivationRegistry<C>
where
    C: MetadataClient + 'static,
{
    async fn ensure_active(&self, key: &NamespacedName) -> Result<Activation, ActivationError> {
        let strategy = self.resolve(key).await?;
        strategy.activate(key).await
    }
}
