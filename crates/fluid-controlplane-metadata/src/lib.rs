pub mod core;
pub mod dataset;
pub mod runtime;
pub mod deployment;
pub mod workload;
pub mod event;

pub(crate) fn is_false(b: &bool) -> bool {
    !b
}

pub mod constants {
    /// finalizer owned by the dataset controller
    pub const DATASET_FINALIZER: &str = "fluid-dataset-controller-finalizer";

    /// namespace hosting engine controllers
    pub const FLUID_SYSTEM_NAMESPACE: &str = "fluid-system";

    /// event reason when a dataset can not be deleted yet
    pub const ERROR_DELETE_DATASET: &str = "ErrorDeleteDataset";
}
