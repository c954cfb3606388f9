use std::fmt;
use std::marker::PhantomData;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use fluid_controlplane_metadata::core::NamespacedName;
use fluid_controlplane_metadata::deployment::DeploymentSpec;
use fluid_controlplane_metadata::runtime::RuntimeSpec;
use fluid_stream_dispatcher::StoreError;
use fluid_stream_dispatcher::metadata::{MetadataClient, SharedClient};

use super::{Activation, ActivationError, EngineActivation};

/// Scale the engine controller deployment from zero to one replica when a runtime
/// of kind `R` exists for the dataset.
pub struct DeploymentScaleout<C, R> {
    client: SharedClient<C>,
    controller: NamespacedName,
    runtime: PhantomData<R>,
}

impl<C, R: RuntimeSpec> fmt::Debug for DeploymentScaleout<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "DeploymentScaleout({}: {})", R::ENGINE, self.controller)
    }
}

impl<C, R> DeploymentScaleout<C, R>
where
    C: MetadataClient,
    R: RuntimeSpec,
{
    pub fn new(client: SharedClient<C>, controller: NamespacedName) -> Self {
        Self {
            client,
            controller,
            runtime: PhantomData,
        }
    }

    pub fn controller(&self) -> &NamespacedName {
        &self.controller
    }
}

#[async_trait]
impl<C, R> EngineActivation for DeploymentScaleout<C, R>
where
    C: MetadataClient + 'static,
    R: RuntimeSpec,
{
    fn engine(&self) -> &str {
        R::ENGINE
    }

    async fn has_runtime(&self, key: &NamespacedName) -> Result<bool, StoreError> {
        match self.client.retrieve_item::<R>(key).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    #[instrument(skip(self), fields(engine = R::ENGINE, controller = %self.controller))]
    async fn activate(&self, key: &NamespacedName) -> Result<Activation, ActivationError> {
        let mut deployment = match self
            .client
            .retrieve_item::<DeploymentSpec>(&self.controller)
            .await
        {
            Ok(deployment) => deployment,
            Err(err) if err.is_not_found() => {
                return Err(ActivationError::ControllerNotFound(self.controller.clone()));
            }
            Err(err) => return Err(err.into()),
        };

        let scaled_up = if deployment.spec.desired_replicas() == 0 {
            deployment.spec.replicas = Some(1);
            self.client.update_item(deployment).await?;
            info!(dataset = %key, "scaled up engine controller");
            true
        } else {
            debug!(replicas = deployment.spec.desired_replicas(), "engine controller already running");
            false
        };

        Ok(Activation {
            controller: self.controller.to_string(),
            scaled_up,
        })
    }
}

#[cfg(test)]
mod test {

    use std::sync::Arc;

    use fluid_controlplane_metadata::core::{MetadataObject, ObjectMeta};
    use fluid_controlplane_metadata::runtime::AlluxioRuntimeSpec;
    use fluid_stream_dispatcher::metadata::memory::MemoryClient;

    use super::*;

    fn scaleout(client: &Arc<MemoryClient>) -> DeploymentScaleout<MemoryClient, AlluxioRuntimeSpec> {
        DeploymentScaleout::new(
            client.clone(),
            NamespacedName::new("fluid-system", "alluxioruntime-controller"),
        )
    }

    #[fluvio_future::test]
    async fn test_scale_up_once() {
        let client = MemoryClient::new_shared();
        client
            .create_item(MetadataObject::new(
                ObjectMeta::new("alluxioruntime-controller", "fluid-system"),
                DeploymentSpec {
                    replicas: Some(0),
                    ..Default::default()
                },
            ))
            .await
            .expect("deployment");

        let key = NamespacedName::new("ns", "ds1");
        let strategy = scaleout(&client);
        assert!(strategy.activate(&key).await.expect("first").scaled_up);
        assert!(!strategy.activate(&key).await.expect("second").scaled_up);

        let deployment = client
            .retrieve_item::<DeploymentSpec>(strategy.controller())
            .await
            .expect("deployment");
        assert_eq!(deployment.spec.replicas, Some(1));
    }

    #[fluvio_future::test]
    async fn test_missing_controller() {
        let client = MemoryClient::new_shared();
        let err = scaleout(&client)
            .activate(&NamespacedName::new("ns", "ds1"))
            .await
            .expect_err("missing");
        assert!(matches!(err, ActivationError::ControllerNotFound(_)));
    }

    #[fluvio_future::test]
    async fn test_has_runtime() {
        let client = MemoryClient::new_shared();
        let key = NamespacedName::new("ns", "ds1");
        let strategy = scaleout(&client);
        assert!(!strategy.has_runtime(&key).await.expect("lookup"));

        client
            .create_item(MetadataObject::new(
                ObjectMeta::new("ds1", "ns"),
                AlluxioRuntimeSpec::default(),
            ))
            .await
            .expect("runtime");
        assert!(strategy.has_runtime(&key).await.expect("lookup"));
    }
}
