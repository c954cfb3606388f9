//!
//! # CLI for Dataset Controller
//!
//! Command line overrides on top of the configuration file or defaults.
//!
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use crate::config::DatasetControllerConfig;

/// cli options
#[derive(Debug, Parser)]
#[command(name = "fluid-controller", about = "Fluid Dataset Controller")]
pub struct DatasetControllerOpt {
    /// run against manifests stored in local directory
    #[arg(long, value_name = "metadata path")]
    local: PathBuf,

    /// configuration file, cli parameters take precedence
    #[arg(long, value_name = "config path", env = "FLUID_CONTROLLER_CONFIG")]
    config: Option<PathBuf>,

    /// namespace to watch, all namespaces if not set
    #[arg(short = 'n', long = "namespace", value_name = "namespace")]
    namespace: Option<String>,

    /// requeue interval while engine controller is not active, e.g. `60s`
    #[arg(long, value_parser = humantime::parse_duration)]
    resync_period: Option<Duration>,

    /// requeue interval while a deleted dataset is still in use, e.g. `10s`
    #[arg(long, value_parser = humantime::parse_duration)]
    deletion_retry_delay: Option<Duration>,

    /// deadline of a single reconciliation
    #[arg(long, value_parser = humantime::parse_duration)]
    reconcile_timeout: Option<Duration>,

    /// number of concurrent reconciliations
    #[arg(long)]
    workers: Option<usize>,

    #[arg(long)]
    finalizer: Option<String>,

    /// namespace of engine controller deployments
    #[arg(long)]
    controller_namespace: Option<String>,

    /// engine controller deployment, e.g. `alluxio=alluxioruntime-controller`
    #[arg(long = "engine", value_name = "engine=deployment", value_parser = parse_engine)]
    engines: Vec<(String, String)>,

    /// only allow white list of controllers
    #[arg(long)]
    white_list: Vec<String>,
}

fn parse_engine(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((engine, deployment)) if !engine.is_empty() && !deployment.is_empty() => {
            Ok((engine.to_owned(), deployment.to_owned()))
        }
        _ => Err(format!("expected <engine>=<deployment>, got '{value}'")),
    }
}

impl DatasetControllerOpt {
    /// controller configuration and metadata path
    #[allow(clippy::wrong_self_convention)]
    fn as_controller_config(self) -> Result<(DatasetControllerConfig, PathBuf)> {
        let mut config = match &self.config {
            Some(path) => DatasetControllerConfig::from_file(path)?,
            None => DatasetControllerConfig::default(),
        };

        if let Some(namespace) = self.namespace {
            config.namespace = Some(namespace);
        }

        if let Some(resync_period) = self.resync_period {
            config.resync_period = resync_period;
        }

        if let Some(deletion_retry_delay) = self.deletion_retry_delay {
            config.deletion_retry_delay = deletion_retry_delay;
        }

        if let Some(reconcile_timeout) = self.reconcile_timeout {
            config.reconcile_timeout = reconcile_timeout;
        }

        if let Some(workers) = self.workers {
            config.workers = workers;
        }

        if let Some(finalizer) = self.finalizer {
            config.finalizer = finalizer;
        }

        if let Some(controller_namespace) = self.controller_namespace {
            config.controller_namespace = controller_namespace;
        }

        config.engines.extend(self.engines);

        if !self.white_list.is_empty() {
            config.white_list = self.white_list.into_iter().collect();
        }

        config.validate()?;
        debug!(?config, "controller config");

        Ok((config, self.local))
    }

    pub fn parse_cli_or_exit(self) -> (DatasetControllerConfig, PathBuf) {
        match self.as_controller_config() {
            Err(err) => {
                eprintln!("\x1B[1;31merror:\x1B[0m {err:#}");
                process::exit(-1);
            }
            Ok(config) => config,
        }
    }
}
