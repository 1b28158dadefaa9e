//! burnerctl
//!
//! Runs capacity-sized density benchmarks against a Kubernetes cluster.
//! Node density variants lease worker nodes with a marker label for the
//! length of the run.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use burner_lib::cluster::{ClusterControlPlane, ClusterStateProbe, KubeControlPlane};
use burner_lib::credentials::{CredentialProvider, RouteCredentialProvider, StaticCredentialProvider};
use burner_lib::lease::NodeLeaseManager;
use burner_lib::runner::ProcessEngine;
use burner_lib::workload::FsTemplateStore;
use burner_lib::{Collaborators, LeaseLabel, Orchestrator, OrchestratorConfig, RunMetrics};
use clap::{Parser, Subcommand};
use commands::run::{IndexerArgs, IterationArgs, NodeDensityArgs, Workload};
use output::{LogFormat, OutputFormat};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Density benchmark orchestrator
#[derive(Parser)]
#[command(name = "burnerctl")]
#[command(author, version, about = "Capacity-sized density benchmarks for Kubernetes clusters", long_about = None)]
pub struct Cli {
    /// Settings file (defaults to ~/.config/burnerctl/config.*)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Path to kubeconfig file (uses KUBECONFIG or in-cluster config if not specified)
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: OutputFormat,

    /// Log line format
    #[arg(long, default_value = "text")]
    pub log_format: LogFormat,

    /// Write Prometheus metrics for the run to this file
    #[arg(long)]
    pub metrics_file: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Index monitoring metrics collected over a trailing window
    Indexer(IndexerArgs),

    /// Create a fixed number of pods on worker nodes
    PodDensity(IterationArgs),

    /// Create a fixed number of mixed resource iterations
    ClusterDensity(IterationArgs),

    /// Fill leased nodes up to a pods-per-node target
    NodeDensity(NodeDensityArgs),

    /// Node density with database and application deployments
    NodeDensityHeavy(NodeDensityArgs),

    /// Node density with client and service pairs
    NodeDensityCni(NodeDensityArgs),

    /// Remove a lease label left behind by an interrupted run
    Release {
        /// Nodes to release, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        nodes: Vec<String>,

        /// Lease label as key=value (defaults to the configured lease label)
        #[arg(long)]
        label: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format, cli.verbose);

    let settings = config::Settings::load(cli.config.as_deref())?;
    debug!(
        engine = %settings.engine_path.display(),
        templates = %settings.template_dir.display(),
        output_dir = %settings.output_dir.display(),
        lease_label = %settings.lease_label,
        "Settings loaded"
    );

    let kubeconfig = cli.kubeconfig.clone().or_else(|| settings.kubeconfig.clone());
    let client = kube_client(kubeconfig.as_deref()).await?;

    let exit_code = match cli.command {
        Commands::Release { nodes, label } => {
            let label = match label {
                Some(label) => label
                    .parse::<LeaseLabel>()
                    .with_context(|| format!("Invalid --label '{}'", label))?,
                None => settings.lease_label()?,
            };
            let plane: Arc<dyn ClusterControlPlane> = Arc::new(KubeControlPlane::new(client));
            let probe = ClusterStateProbe::new(plane.clone(), settings.role_filter());
            let leases = NodeLeaseManager::new(probe, plane);
            commands::release::release_nodes(&leases, nodes, label, cli.format).await
        }
        Commands::Indexer(args) => {
            run(&settings, client, Workload::Indexer(args.into()), cli.format).await?
        }
        Commands::PodDensity(args) => {
            run(&settings, client, Workload::pod_density(args), cli.format).await?
        }
        Commands::ClusterDensity(args) => {
            run(&settings, client, Workload::cluster_density(args), cli.format).await?
        }
        Commands::NodeDensity(args) => {
            run(&settings, client, Workload::NodeDensity(args.into()), cli.format).await?
        }
        Commands::NodeDensityHeavy(args) => {
            let workload = Workload::NodeDensityHeavy(args.into());
            run(&settings, client, workload, cli.format).await?
        }
        Commands::NodeDensityCni(args) => {
            run(&settings, client, Workload::NodeDensityCni(args.into()), cli.format).await?
        }
    };

    if let Some(path) = &cli.metrics_file {
        write_metrics(path)?;
    }

    info!(exit_code, "burnerctl finished");
    std::process::exit(exit_code);
}

/// Wire the cluster-backed collaborators and run one workload
async fn run(
    settings: &config::Settings,
    client: kube::Client,
    workload: Workload,
    format: OutputFormat,
) -> Result<i32> {
    let credentials: Arc<dyn CredentialProvider> = match settings.static_monitoring() {
        Some((url, token)) => Arc::new(StaticCredentialProvider::new(url, token)?),
        None => Arc::new(RouteCredentialProvider::new(
            client.clone(),
            settings.monitoring_target(),
        )),
    };

    let orchestrator = Orchestrator::new(
        Collaborators {
            plane: Arc::new(KubeControlPlane::new(client)),
            credentials,
            templates: Arc::new(FsTemplateStore::new(
                &settings.template_dir,
                &settings.output_dir,
            )),
            engine: Arc::new(ProcessEngine::new(&settings.engine_path)),
        },
        OrchestratorConfig {
            lease_label: settings.lease_label()?,
            role_filter: settings.role_filter(),
            metrics_profile: settings.metrics_profile.clone(),
        },
    );

    let result = commands::run::run_workload(&orchestrator, &workload, format).await;
    Ok(result.exit_code())
}

fn init_tracing(log_format: LogFormat, verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries command output; logs go to stderr
    match log_format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

async fn kube_client(kubeconfig: Option<&Path>) -> Result<kube::Client> {
    let config = match kubeconfig {
        Some(path) => {
            let kubeconfig = kube::config::Kubeconfig::read_from(path)
                .with_context(|| format!("Failed to read kubeconfig {}", path.display()))?;
            kube::Config::from_custom_kubeconfig(
                kubeconfig,
                &kube::config::KubeConfigOptions::default(),
            )
            .await
            .context("Failed to load kubeconfig")?
        }
        None => kube::Config::infer()
            .await
            .context("Failed to infer Kubernetes config")?,
    };
    kube::Client::try_from(config).context("Failed to create Kubernetes client")
}

fn write_metrics(path: &Path) -> Result<()> {
    let text = RunMetrics::new()
        .render()
        .context("Failed to encode metrics")?;
    std::fs::write(path, text)
        .with_context(|| format!("Failed to write metrics to {}", path.display()))
}
