//! Error types for the orchestrator

use crate::models::WorkloadVariant;
use std::path::PathBuf;
use thiserror::Error;

/// Cluster capacity could not support the requested run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapacityError {
    #[error("not enough worker nodes to label: requested {requested}, eligible {available}")]
    InsufficientNodes { requested: usize, available: usize },

    #[error("no eligible worker nodes present on the cluster")]
    NoEligibleNodes,

    #[error(
        "no pods to deploy for {variant}: computed {computed} \
         ({pods_per_node} pods/node x {node_count} nodes - {already_running} running)"
    )]
    NonPositiveDeployCount {
        computed: i64,
        pods_per_node: u64,
        node_count: u64,
        already_running: u64,
        variant: WorkloadVariant,
    },
}

/// Template could not be read, interpreted or written
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read template {path}: {source}")]
    TemplateUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed template: {0}")]
    TemplateMalformed(String),

    #[error("template has no element at {0}")]
    MissingPath(String),

    #[error("invalid override: {0}")]
    InvalidOverride(String),

    #[error("failed to write run config {path}: {source}")]
    PersistFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Monitoring endpoint or token retrieval failed
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("monitoring route {namespace}/{name} lookup failed: {reason}")]
    Endpoint {
        namespace: String,
        name: String,
        reason: String,
    },

    #[error("invalid monitoring endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("token request for service account {namespace}/{name} failed: {reason}")]
    Token {
        namespace: String,
        name: String,
        reason: String,
    },
}

/// Top-level error type
#[derive(Error, Debug)]
pub enum BurnerError {
    #[error(transparent)]
    Capacity(#[from] CapacityError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("{command} failed with return code {exit_code}:\n{output}")]
    ExternalProcess {
        command: String,
        exit_code: i32,
        output: String,
    },

    #[error("cluster API error: {0}")]
    Cluster(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BurnerError {
    /// Exit code reported in a failed run result
    pub fn exit_code(&self) -> i32 {
        match self {
            BurnerError::ExternalProcess { exit_code, .. } => *exit_code,
            BurnerError::Capacity(_) => 2,
            BurnerError::Config(_) => 3,
            BurnerError::Credential(_) => 4,
            BurnerError::Cluster(_) => 5,
            BurnerError::Io(_) => 6,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BurnerError::Capacity(_) => "capacity",
            BurnerError::Config(_) => "config",
            BurnerError::Credential(_) => "credential",
            BurnerError::ExternalProcess { .. } => "external_process",
            BurnerError::Cluster(_) => "cluster",
            BurnerError::Io(_) => "io",
        }
    }
}

impl From<kube::Error> for BurnerError {
    fn from(err: kube::Error) -> Self {
        BurnerError::Cluster(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, BurnerError>;
