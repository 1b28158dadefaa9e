//! Core data models for the benchmark orchestrator

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Ordered, duplicate-free set of node names
///
/// Iteration order is insertion order, which for probed sets is the order the
/// control plane returned the nodes in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeSet(Vec<String>);

impl NodeSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert a node, returning false if it was already present
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.0.push(name);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }

    /// First `count` nodes in insertion order
    pub fn take_first(&self, count: usize) -> NodeSet {
        Self(self.0.iter().take(count).cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for NodeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = NodeSet::new();
        for name in iter {
            set.insert(name);
        }
        set
    }
}

impl fmt::Display for NodeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(","))
    }
}

/// Supported workload shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkloadVariant {
    Indexer,
    PodDensity,
    ClusterDensity,
    NodeDensity,
    NodeDensityHeavy,
    NodeDensityCni,
}

impl WorkloadVariant {
    pub const ALL: [WorkloadVariant; 6] = [
        WorkloadVariant::Indexer,
        WorkloadVariant::PodDensity,
        WorkloadVariant::ClusterDensity,
        WorkloadVariant::NodeDensity,
        WorkloadVariant::NodeDensityHeavy,
        WorkloadVariant::NodeDensityCni,
    ];

    /// Stable name, used for template file names, job names and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadVariant::Indexer => "kube-burner-indexer",
            WorkloadVariant::PodDensity => "pod-density",
            WorkloadVariant::ClusterDensity => "cluster-density",
            WorkloadVariant::NodeDensity => "node-density",
            WorkloadVariant::NodeDensityHeavy => "node-density-heavy",
            WorkloadVariant::NodeDensityCni => "node-density-cni",
        }
    }

    /// Whether runs of this variant lease nodes and size themselves to them
    pub fn is_node_density(&self) -> bool {
        matches!(
            self,
            WorkloadVariant::NodeDensity
                | WorkloadVariant::NodeDensityHeavy
                | WorkloadVariant::NodeDensityCni
        )
    }

    /// Heavy and CNI iterations create two pods each, so the deploy count halves
    pub fn halves_deploy_count(&self) -> bool {
        matches!(
            self,
            WorkloadVariant::NodeDensityHeavy | WorkloadVariant::NodeDensityCni
        )
    }
}

impl fmt::Display for WorkloadVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input to the capacity planner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityRequest {
    /// Number of target nodes (the orchestrator resolves 0 to the leased count)
    pub node_count: u64,
    pub pods_per_node: u64,
    /// Running pods already scheduled on the target nodes
    pub already_running_on_target: u64,
    pub variant: WorkloadVariant,
}

/// Marker label applied to leased nodes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeaseLabel {
    pub key: String,
    pub value: String,
}

impl LeaseLabel {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl Default for LeaseLabel {
    fn default() -> Self {
        Self::new("node-density", "enabled")
    }
}

impl FromStr for LeaseLabel {
    type Err = ConfigError;

    /// Parse `key=value`; the value may be empty
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidOverride(format!("label '{}' is not key=value", s)))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::InvalidOverride(format!(
                "label '{}' has an empty key",
                s
            )));
        }
        Ok(Self::new(key, value.trim()))
    }
}

impl fmt::Display for LeaseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Nodes carrying the lease label for the duration of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLease {
    pub label: LeaseLabel,
    pub leased_nodes: NodeSet,
}

/// Monitoring endpoint and bearer token handed to the benchmark engine
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub endpoint: String,
    pub token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("endpoint", &self.endpoint)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Unified outcome of one orchestrated run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunResult {
    Success { run_id: Uuid, output: String },
    Failure { exit_code: i32, message: String },
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        matches!(self, RunResult::Success { .. })
    }

    /// Process-style exit code: 0 on success
    pub fn exit_code(&self) -> i32 {
        match self {
            RunResult::Success { .. } => 0,
            RunResult::Failure { exit_code, .. } => *exit_code,
        }
    }

    pub fn outcome_label(&self) -> &'static str {
        match self {
            RunResult::Success { .. } => "success",
            RunResult::Failure { .. } => "failure",
        }
    }
}
