//! Workload run commands

use crate::output::{print_info, print_run_result, OutputFormat};
use burner_lib::orchestrator::{
    ClusterDensityParams, CommonParams, IndexerParams, NodeDensityParams, PodDensityParams,
    DEFAULT_ES_INDEX, DEFAULT_ES_SERVER, DEFAULT_POD_NODE_SELECTOR,
};
use burner_lib::{Orchestrator, RunResult, WorkloadVariant};
use clap::{ArgAction, Args};
use uuid::Uuid;

/// Options shared by every workload variant
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Resource kinds to wait for, comma separated (empty waits for all)
    #[arg(long, value_delimiter = ',')]
    pub wait_for: Vec<String>,

    /// Also write collected metrics to local files
    #[arg(long)]
    pub write_to_file: bool,

    /// Index metrics into Elasticsearch
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub indexing: bool,

    #[arg(long, default_value = DEFAULT_ES_SERVER)]
    pub es_server: String,

    #[arg(long, default_value = DEFAULT_ES_INDEX)]
    pub es_index: String,

    #[arg(long, default_value_t = 20)]
    pub qps: u32,

    #[arg(long, default_value_t = 20)]
    pub burst: u32,

    /// Wait for pods of each iteration before the next
    #[arg(long)]
    pub pod_wait: bool,

    /// Delete created resources when the run ends
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub cleanup: bool,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub wait_when_finished: bool,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub verify_objects: bool,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub error_on_verify: bool,

    /// Engine-side wait timeout, e.g. 1h
    #[arg(long, default_value = "1h")]
    pub max_wait_timeout: String,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub preload_images: bool,

    #[arg(long, default_value = "2m")]
    pub preload_period: String,

    /// P99 pod ready latency threshold
    #[arg(long, default_value = "5000ms")]
    pub pod_ready_threshold: String,

    #[arg(long)]
    pub namespaced_iterations: bool,
}

impl From<CommonArgs> for CommonParams {
    fn from(args: CommonArgs) -> Self {
        Self {
            wait_for: args.wait_for,
            write_to_file: args.write_to_file,
            indexing: args.indexing,
            es_server: args.es_server,
            es_index: args.es_index,
            qps: args.qps,
            burst: args.burst,
            pod_wait: args.pod_wait,
            cleanup: args.cleanup,
            wait_when_finished: args.wait_when_finished,
            verify_objects: args.verify_objects,
            error_on_verify: args.error_on_verify,
            max_wait_timeout: args.max_wait_timeout,
            preload_images: args.preload_images,
            preload_period: args.preload_period,
            pod_ready_threshold: args.pod_ready_threshold,
            namespaced_iterations: args.namespaced_iterations,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct IndexerArgs {
    /// Minutes of monitoring data to index, ending now
    #[arg(long)]
    pub collection_time: u32,

    #[arg(long, default_value = DEFAULT_ES_SERVER)]
    pub es_server: String,

    #[arg(long, default_value = DEFAULT_ES_INDEX)]
    pub es_index: String,

    #[arg(long, default_value = "kube-burner-indexer")]
    pub job_name: String,

    #[arg(long)]
    pub write_to_file: bool,
}

impl From<IndexerArgs> for IndexerParams {
    fn from(args: IndexerArgs) -> Self {
        Self {
            collection_time: args.collection_time,
            es_server: args.es_server,
            es_index: args.es_index,
            job_name: args.job_name,
            write_to_file: args.write_to_file,
        }
    }
}

/// Pod and cluster density options
#[derive(Args, Debug, Clone)]
pub struct IterationArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Node selector for benchmark pods, as a YAML flow mapping
    #[arg(long, default_value = DEFAULT_POD_NODE_SELECTOR)]
    pub pod_node_selector: String,

    #[arg(long, default_value_t = 1000)]
    pub job_iterations: u64,
}

#[derive(Args, Debug, Clone)]
pub struct NodeDensityArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Worker nodes to lease (0 leases every eligible worker)
    #[arg(long)]
    pub node_count: usize,

    #[arg(long, default_value_t = 245)]
    pub pods_per_node: u64,
}

impl From<NodeDensityArgs> for NodeDensityParams {
    fn from(args: NodeDensityArgs) -> Self {
        Self {
            common: args.common.into(),
            node_count: args.node_count,
            pods_per_node: args.pods_per_node,
        }
    }
}

/// One requested run with its parameters
#[derive(Debug, Clone)]
pub enum Workload {
    Indexer(IndexerParams),
    PodDensity(PodDensityParams),
    ClusterDensity(ClusterDensityParams),
    NodeDensity(NodeDensityParams),
    NodeDensityHeavy(NodeDensityParams),
    NodeDensityCni(NodeDensityParams),
}

impl Workload {
    pub fn pod_density(args: IterationArgs) -> Self {
        Workload::PodDensity(PodDensityParams {
            common: args.common.into(),
            pod_node_selector: args.pod_node_selector,
            job_iterations: args.job_iterations,
        })
    }

    pub fn cluster_density(args: IterationArgs) -> Self {
        Workload::ClusterDensity(ClusterDensityParams {
            common: args.common.into(),
            pod_node_selector: args.pod_node_selector,
            job_iterations: args.job_iterations,
        })
    }

    pub fn variant(&self) -> WorkloadVariant {
        match self {
            Workload::Indexer(_) => WorkloadVariant::Indexer,
            Workload::PodDensity(_) => WorkloadVariant::PodDensity,
            Workload::ClusterDensity(_) => WorkloadVariant::ClusterDensity,
            Workload::NodeDensity(_) => WorkloadVariant::NodeDensity,
            Workload::NodeDensityHeavy(_) => WorkloadVariant::NodeDensityHeavy,
            Workload::NodeDensityCni(_) => WorkloadVariant::NodeDensityCni,
        }
    }
}

/// Run one workload under a fresh run id and print the outcome
pub async fn run_workload(
    orchestrator: &Orchestrator,
    workload: &Workload,
    format: OutputFormat,
) -> RunResult {
    let run_id = Uuid::new_v4();
    let variant = workload.variant();
    print_info(&format!("Starting {} run {}", variant, run_id));

    let result = match workload {
        Workload::Indexer(params) => orchestrator.run_indexer(run_id, params).await,
        Workload::PodDensity(params) => orchestrator.run_pod_density(run_id, params).await,
        Workload::ClusterDensity(params) => orchestrator.run_cluster_density(run_id, params).await,
        Workload::NodeDensity(params) => orchestrator.run_node_density(run_id, params).await,
        Workload::NodeDensityHeavy(params) => {
            orchestrator.run_node_density_heavy(run_id, params).await
        }
        Workload::NodeDensityCni(params) => orchestrator.run_node_density_cni(run_id, params).await,
    };

    print_run_result(variant, &result, format);
    result
}
