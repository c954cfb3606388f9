use async_trait::async_trait;
use tracing::{debug, trace};

use fluid_controlplane_metadata::core::NamespacedName;
use fluid_controlplane_metadata::workload::{PersistentVolumeClaimSpec, PodSpec};
use fluid_stream_dispatcher::metadata::{MetadataClient, NameSpace, SharedClient};

use super::{UsageChecker, UsageError};

/// A dataset is exposed to workloads as a volume claim with the same name.
/// It is in use while any pod that mounts the claim has not completed.
#[derive(Debug)]
pub struct VolumeClaimUsage<C> {
    client: SharedClient<C>,
}

impl<C> VolumeClaimUsage<C> {
    pub fn new(client: SharedClient<C>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C> UsageChecker for VolumeClaimUsage<C>
where
    C: MetadataClient + 'static,
{
    async fn check_in_use(&self, name: &str, namespace: &str) -> Result<(), UsageError> {
        let dataset = NamespacedName::new(namespace, name);

        match self
            .client
            .retrieve_item::<PersistentVolumeClaimSpec>(&dataset)
            .await
        {
            Ok(_) => {}
            Err(err) if err.is_not_found() => {
                trace!(%dataset, "no volume claim, safe to delete");
                return Ok(());
            }
            Err(source) => return Err(UsageError::Indeterminate { dataset, source }),
        }

        let pods = match self
            .client
            .retrieve_items::<PodSpec>(&NameSpace::Named(namespace.to_owned()))
            .await
        {
            Ok(pods) => pods,
            Err(source) => return Err(UsageError::Indeterminate { dataset, source }),
        };

        if let Some(pod) = pods
            .items
            .iter()
            .find(|pod| pod.spec.mounts_claim(name) && !pod.status.is_complete())
        {
            debug!(%dataset, pod = %pod.metadata.name, "volume claim mounted");
            return Err(UsageError::InUse {
                dataset,
                pod: pod.metadata.name.clone(),
            });
        }

        Ok(())
    }
}
