//!
//! # Usage safety
//!
//! Decides whether a terminating dataset may be released. Any doubt blocks deletion.
//!
mod volume_claim;

pub use volume_claim::VolumeClaimUsage;

use async_trait::async_trait;

use fluid_controlplane_metadata::core::NamespacedName;
use fluid_stream_dispatcher::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum UsageError {
    #[error("dataset {dataset} is still in use by pod {pod}")]
    InUse {
        dataset: NamespacedName,
        pod: String,
    },
    #[error("usage of dataset {dataset} can not be determined: {source}")]
    Indeterminate {
        dataset: NamespacedName,
        #[source]
        source: StoreError,
    },
}

#[async_trait]
pub trait UsageChecker: Send + Sync {
    /// `Ok` only when no workload consumes the dataset
    async fn check_in_use(&self, name: &str, namespace: &str) -> Result<(), UsageError>;
}
