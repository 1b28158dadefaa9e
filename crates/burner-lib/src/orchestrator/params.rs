//! Parameter sets accepted by the per-variant operations
//!
//! Every workload run shares [`CommonParams`]; variant-specific fields live
//! in a separate struct that embeds it.

use serde::{Deserialize, Serialize};

pub const DEFAULT_ES_SERVER: &str =
    "https://search-perfscale-dev-chmf5l4sh66lvxbnadi4bznl3a.us-west-2.es.amazonaws.com:443";
pub const DEFAULT_ES_INDEX: &str = "ripsaw-kube-burner";
pub const DEFAULT_POD_NODE_SELECTOR: &str = "{node-role.kubernetes.io/worker: \"\"}";

/// Parameters for the metrics indexer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexerParams {
    /// Minutes of monitoring data to collect, ending now
    pub collection_time: u32,
    #[serde(default = "default_es_server")]
    pub es_server: String,
    #[serde(default = "default_es_index")]
    pub es_index: String,
    #[serde(default = "default_indexer_job_name")]
    pub job_name: String,
    #[serde(default)]
    pub write_to_file: bool,
}

impl IndexerParams {
    pub fn new(collection_time: u32) -> Self {
        Self {
            collection_time,
            es_server: default_es_server(),
            es_index: default_es_index(),
            job_name: default_indexer_job_name(),
            write_to_file: false,
        }
    }
}

/// Parameters shared by every workload variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommonParams {
    /// Resource kinds to wait for; empty waits for all
    pub wait_for: Vec<String>,
    pub write_to_file: bool,
    pub indexing: bool,
    pub es_server: String,
    pub es_index: String,
    pub qps: u32,
    pub burst: u32,
    pub pod_wait: bool,
    pub cleanup: bool,
    pub wait_when_finished: bool,
    pub verify_objects: bool,
    pub error_on_verify: bool,
    pub max_wait_timeout: String,
    pub preload_images: bool,
    pub preload_period: String,
    /// Pod ready latency threshold; used by pod-density and node-density variants
    pub pod_ready_threshold: String,
    pub namespaced_iterations: bool,
}

impl Default for CommonParams {
    fn default() -> Self {
        Self {
            wait_for: Vec::new(),
            write_to_file: false,
            indexing: true,
            es_server: default_es_server(),
            es_index: default_es_index(),
            qps: 20,
            burst: 20,
            pod_wait: false,
            cleanup: true,
            wait_when_finished: true,
            verify_objects: true,
            error_on_verify: true,
            max_wait_timeout: "1h".to_string(),
            preload_images: true,
            preload_period: "2m".to_string(),
            pod_ready_threshold: "5000ms".to_string(),
            namespaced_iterations: false,
        }
    }
}

/// Pod density: a flat number of job iterations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PodDensityParams {
    #[serde(flatten)]
    pub common: CommonParams,
    pub pod_node_selector: String,
    pub job_iterations: u64,
}

impl Default for PodDensityParams {
    fn default() -> Self {
        Self {
            common: CommonParams::default(),
            pod_node_selector: DEFAULT_POD_NODE_SELECTOR.to_string(),
            job_iterations: 1000,
        }
    }
}

/// Cluster density: a flat number of job iterations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterDensityParams {
    #[serde(flatten)]
    pub common: CommonParams,
    pub pod_node_selector: String,
    pub job_iterations: u64,
}

impl Default for ClusterDensityParams {
    fn default() -> Self {
        Self {
            common: CommonParams::default(),
            pod_node_selector: DEFAULT_POD_NODE_SELECTOR.to_string(),
            job_iterations: 1000,
        }
    }
}

/// Node density family: pods per leased node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDensityParams {
    #[serde(flatten)]
    pub common: CommonParams,
    /// Worker nodes to lease; 0 leases every eligible worker
    pub node_count: usize,
    #[serde(default = "default_pods_per_node")]
    pub pods_per_node: u64,
}

impl NodeDensityParams {
    pub fn new(node_count: usize) -> Self {
        Self {
            common: CommonParams::default(),
            node_count,
            pods_per_node: default_pods_per_node(),
        }
    }
}

fn default_es_server() -> String {
    DEFAULT_ES_SERVER.to_string()
}

fn default_es_index() -> String {
    DEFAULT_ES_INDEX.to_string()
}

fn default_indexer_job_name() -> String {
    "kube-burner-indexer".to_string()
}

fn default_pods_per_node() -> u64 {
    245
}
