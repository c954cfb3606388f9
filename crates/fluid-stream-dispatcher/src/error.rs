use fluid_controlplane_metadata::core::NamespacedName;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} '{key}' not found")]
    NotFound {
        kind: &'static str,
        key: NamespacedName,
    },
    #[error("{kind} '{key}' already exists")]
    AlreadyExists {
        kind: &'static str,
        key: NamespacedName,
    },
    #[error("{kind} '{key}' was modified, resource version {expected} is stale, current: {actual}")]
    Conflict {
        kind: &'static str,
        key: NamespacedName,
        expected: String,
        actual: String,
    },
    #[error("Yaml serialization error: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("resource version {version} is too old, oldest available: {oldest}")]
    Expired { version: String, oldest: String },
    #[error("store is closed")]
    Closed,
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// watch can't resume, caller must list again
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired { .. })
    }
}
