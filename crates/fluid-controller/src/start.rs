use std::path::Path;
use std::process;

use anyhow::Result;
use tracing::{info, error};

use fluvio_future::task::run_block_on;

use fluid_controlplane_metadata::dataset::DatasetSpec;
use fluid_controlplane_metadata::deployment::DeploymentSpec;
use fluid_controlplane_metadata::runtime::AlluxioRuntimeSpec;
use fluid_controlplane_metadata::workload::{PersistentVolumeClaimSpec, PodSpec};
use fluid_stream_dispatcher::metadata::local::LocalManifests;
use fluid_stream_dispatcher::metadata::memory::MemoryClient;

use crate::cli::DatasetControllerOpt;
use crate::config::DatasetControllerConfig;
use crate::core::Context;
use crate::start_main_loop;

pub fn main_loop(opt: DatasetControllerOpt) {
    let (config, metadata_path) = opt.parse_cli_or_exit();

    info!(version = crate::VERSION, "Starting Fluid Dataset Controller");

    run_block_on(async move {
        if let Err(err) = run_local(config, &metadata_path).await {
            error!("controller failed: {err:#}");
            process::exit(-1);
        }
    });

    info!("Dataset Controller terminated");
}

/// seed in-memory store from manifests and run until shutdown
async fn run_local(config: DatasetControllerConfig, metadata_path: &Path) -> Result<()> {
    info!(path = %metadata_path.display(), "loading local manifests");
    let client = MemoryClient::new_shared();
    let manifests = LocalManifests::new(metadata_path);

    let datasets = manifests.seed::<DatasetSpec, _>(client.as_ref()).await?;
    let runtimes = manifests.seed::<AlluxioRuntimeSpec, _>(client.as_ref()).await?;
    let deployments = manifests.seed::<DeploymentSpec, _>(client.as_ref()).await?;
    let claims = manifests.seed::<PersistentVolumeClaimSpec, _>(client.as_ref()).await?;
    let pods = manifests.seed::<PodSpec, _>(client.as_ref()).await?;
    info!(datasets, runtimes, deployments, claims, pods, "loaded manifests");

    let ctx = Context::new(config, client).shared();
    let handle = start_main_loop(ctx);
    handle.wait_for_shutdown().await;

    Ok(())
}
