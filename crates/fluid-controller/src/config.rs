//!
//! # Controller configuration
//!
//! Values are applied in the following sequence:
//!     1) defaults
//!     2) configuration file if provided
//!     3) cli parameters
//!
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Serialize, Deserialize};

use fluid_controlplane_metadata::constants::{DATASET_FINALIZER, FLUID_SYSTEM_NAMESPACE};
use fluid_controlplane_metadata::runtime::{AlluxioRuntimeSpec, RuntimeSpec};
use fluid_stream_dispatcher::metadata::NameSpace;
use fluid_stream_dispatcher::queue::{Backoff, DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_MAX};

macro_rules! whitelist {
    ($config:expr,$name:expr,$start:expr) => {
        if $config.enabled($name) {
            $start;
        }
    };
}

pub const DEFAULT_RESYNC_PERIOD: Duration = Duration::from_secs(60);
pub const DEFAULT_DELETION_RETRY_DELAY: Duration = Duration::from_secs(10);
pub const DEFAULT_RECONCILE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_WORKERS: usize = 3;

/// deployment name of the controller serving an engine
pub fn default_controller_name(engine: &str) -> String {
    format!("{engine}runtime-controller")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatasetControllerConfig {
    /// namespace to watch, all namespaces if not set
    pub namespace: Option<String>,

    /// finalizer token owned by this controller
    pub finalizer: String,

    /// requeue delay while the engine controller can't be activated
    #[serde(with = "humantime_serde")]
    pub resync_period: Duration,

    /// requeue delay while a terminating dataset is still in use
    #[serde(with = "humantime_serde")]
    pub deletion_retry_delay: Duration,

    #[serde(with = "humantime_serde")]
    pub reconcile_timeout: Duration,

    #[serde(with = "humantime_serde")]
    pub backoff_base: Duration,

    #[serde(with = "humantime_serde")]
    pub backoff_max: Duration,

    pub workers: usize,

    /// namespace of engine controller deployments
    pub controller_namespace: String,

    /// engine type tag to controller deployment name
    pub engines: BTreeMap<String, String>,

    /// controllers to start, all if empty
    pub white_list: BTreeSet<String>,
}

impl Default for DatasetControllerConfig {
    fn default() -> Self {
        let engine = AlluxioRuntimeSpec::ENGINE;
        Self {
            namespace: None,
            finalizer: DATASET_FINALIZER.to_owned(),
            resync_period: DEFAULT_RESYNC_PERIOD,
            deletion_retry_delay: DEFAULT_DELETION_RETRY_DELAY,
            reconcile_timeout: DEFAULT_RECONCILE_TIMEOUT,
            backoff_base: DEFAULT_BACKOFF_BASE,
            backoff_max: DEFAULT_BACKOFF_MAX,
            workers: DEFAULT_WORKERS,
            controller_namespace: FLUID_SYSTEM_NAMESPACE.to_owned(),
            engines: BTreeMap::from([(engine.to_owned(), default_controller_name(engine))]),
            white_list: BTreeSet::new(),
        }
    }
}

impl DatasetControllerConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read config {}", path.display()))?;
        let config = serde_yaml::from_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    /// controller is enabled by white list
    pub fn enabled(&self, name: &str) -> bool {
        self.white_list.is_empty() || self.white_list.contains(name)
    }

    pub fn scope(&self) -> NameSpace {
        self.namespace.clone().into()
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.backoff_base, self.backoff_max)
    }

    pub fn validate(&self) -> Result<()> {
        if self.finalizer.is_empty() {
            anyhow::bail!("finalizer must not be empty");
        }
        if self.workers == 0 {
            anyhow::bail!("at least one worker is required");
        }
        if self.backoff_base > self.backoff_max {
            anyhow::bail!(
                "backoff base {:?} exceeds backoff max {:?}",
                self.backoff_base,
                self.backoff_max
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn test_defaults() {
        let config = DatasetControllerConfig::default();
        assert_eq!(config.finalizer, "fluid-dataset-controller-finalizer");
        assert_eq!(config.deletion_retry_delay, Duration::from_secs(10));
        assert_eq!(
            config.engines.get("alluxio").map(String::as_str),
            Some("alluxioruntime-controller")
        );
        assert!(config.enabled("dataset"));
        assert_eq!(config.scope(), NameSpace::All);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
namespace: ns
resyncPeriod: 2m
deletionRetryDelay: 500ms
whiteList: [dataset]
"#,
        )
        .expect("write");

        let config = DatasetControllerConfig::from_file(&path).expect("load");
        assert_eq!(config.resync_period, Duration::from_secs(120));
        assert_eq!(config.deletion_retry_delay, Duration::from_millis(500));
        assert_eq!(config.scope(), NameSpace::Named("ns".to_owned()));
        assert!(config.enabled("dataset"));
        assert!(!config.enabled("runtime"));
        // unspecified values keep defaults
        assert_eq!(config.workers, DEFAULT_WORKERS);
    }

    #[test]
    fn test_validate() {
        let config = DatasetControllerConfig {
            finalizer: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = DatasetControllerConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
