use fluid_controlplane_metadata::core::{MetadataObject, NamespacedName};
use fluid_controlplane_metadata::dataset::DatasetSpec;

pub type DatasetObject = MetadataObject<DatasetSpec>;

/// Everything known about one reconciliation pass, built once after the dataset is loaded
#[derive(Debug, Clone)]
pub struct ReconcileRequest {
    key: NamespacedName,
    dataset: DatasetObject,
    needs_requeue: bool,
}

impl ReconcileRequest {
    pub fn new(key: NamespacedName, dataset: DatasetObject, needs_requeue: bool) -> Self {
        Self {
            key,
            dataset,
            needs_requeue,
        }
    }

    pub fn key(&self) -> &NamespacedName {
        &self.key
    }

    /// dataset as loaded at the start of the pass
    pub fn dataset(&self) -> &DatasetObject {
        &self.dataset
    }

    /// engine controller could not be activated
    pub fn needs_requeue(&self) -> bool {
        self.needs_requeue
    }

    pub fn is_being_deleted(&self) -> bool {
        self.dataset.metadata.is_being_deleted()
    }
}
