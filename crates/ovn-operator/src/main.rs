//! OVN operator - per-node OVN and Open vSwitch agent lifecycle

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use ovn_common::kube_utils::create_client;
use ovn_common::telemetry::{init_telemetry, TelemetryConfig};
use ovn_common::ImageDefaults;
use ovn_operator::controller_runner::build_agent_controllers;
use ovn_operator::crds::{crd_manifests, ensure_crds_installed};

/// OVN operator - runs OVN controller and Open vSwitch agents on every node
#[derive(Parser, Debug)]
#[command(name = "ovn-operator", version, about, long_about = None)]
struct Cli {
    /// Generate CRD manifests and exit
    #[arg(long)]
    crd: bool,

    /// Path to a kubeconfig file (in-cluster config when unset)
    #[arg(long, env = "KUBECONFIG")]
    kubeconfig: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as controller (default mode)
    ///
    /// Watches OVNController, OVSDBServer and OVSvswitchd resources and keeps
    /// one agent DaemonSet per resource rolled out.
    Controller,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.crd {
        print!("{}", crd_manifests()?);
        return Ok(());
    }

    init_telemetry(TelemetryConfig::default())
        .map_err(|e| anyhow::anyhow!("failed to initialize telemetry: {}", e))?;

    match cli.command {
        Some(Commands::Controller) | None => run_controller(cli.kubeconfig).await,
    }
}

async fn run_controller(kubeconfig: Option<PathBuf>) -> anyhow::Result<()> {
    tracing::info!("Starting OVN operator...");

    let client = create_client(kubeconfig.as_deref())
        .await
        .map_err(|e| anyhow::anyhow!("failed to create Kubernetes client: {}", e))?;

    ensure_crds_installed(&client).await?;

    let images = ImageDefaults::from_env();
    tracing::info!(
        controller = %images.controller,
        db_server = %images.db_server,
        vswitchd = %images.vswitchd,
        "default agent images"
    );

    tracing::info!("Starting controllers:");
    let controllers = build_agent_controllers(client, images);
    futures::future::join_all(controllers).await;

    tracing::info!("OVN operator shutting down");
    Ok(())
}
