//! Cluster state access
//!
//! The orchestrator reaches the cluster only through [`ClusterControlPlane`].
//! [`KubeControlPlane`] implements it on top of kube-rs; tests substitute an
//! in-memory plane.

mod kube_plane;
mod probe;

pub use kube_plane::KubeControlPlane;
pub use probe::ClusterStateProbe;

use crate::error::{BurnerError, Result};
use crate::models::NodeSet;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use tracing::warn;

/// Label prefix carried by node role labels
pub const NODE_ROLE_PREFIX: &str = "node-role.kubernetes.io/";

/// Control-plane operations used by the probe and the lease manager
#[async_trait]
pub trait ClusterControlPlane: Send + Sync {
    /// Names of nodes matching the role filter, in API order
    async fn list_nodes(&self, filter: &RoleFilter) -> Result<Vec<String>>;

    /// Set `key=value` on every node in the set (overwriting any existing value)
    async fn label_nodes(&self, nodes: &NodeSet, key: &str, value: &str) -> Result<()>;

    /// Remove `key` from every node in the set regardless of its value
    ///
    /// Nodes that lack the key, or no longer exist, are not an error. A
    /// failure on one node does not stop removal from the others.
    async fn unlabel_nodes(&self, nodes: &NodeSet, key: &str) -> Result<()>;

    /// Running pods grouped by the node they are scheduled on, cluster-wide
    async fn running_pods_by_node(&self) -> Result<HashMap<String, u64>>;
}

/// Node role selection: all `required` roles present, no `excluded` role present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleFilter {
    pub required: Vec<String>,
    pub excluded: Vec<String>,
}

impl Default for RoleFilter {
    fn default() -> Self {
        Self {
            required: vec!["worker".to_string()],
            excluded: vec!["infra".to_string(), "workload".to_string()],
        }
    }
}

impl RoleFilter {
    pub fn new(required: Vec<String>, excluded: Vec<String>) -> Self {
        Self { required, excluded }
    }

    /// Kubernetes label selector expressing this filter
    pub fn label_selector(&self) -> String {
        self.required
            .iter()
            .map(|role| format!("{}{}", NODE_ROLE_PREFIX, role))
            .chain(
                self.excluded
                    .iter()
                    .map(|role| format!("!{}{}", NODE_ROLE_PREFIX, role)),
            )
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Evaluate the filter against a node's labels
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        let has_role = |role: &String| labels.contains_key(&format!("{}{}", NODE_ROLE_PREFIX, role));
        self.required.iter().all(has_role) && !self.excluded.iter().any(has_role)
    }
}

/// Apply `patch` to every node in order, continuing past failures
///
/// Returns one cluster error naming each node that failed.
pub(crate) async fn patch_each<F, Fut>(nodes: &NodeSet, action: &str, mut patch: F) -> Result<()>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = std::result::Result<(), String>>,
{
    let mut failed = Vec::new();
    for name in nodes.iter() {
        if let Err(reason) = patch(name.to_string()).await {
            warn!(node = %name, action = %action, error = %reason, "Node patch failed");
            failed.push(format!("{} ({})", name, reason));
        }
    }

    if failed.is_empty() {
        return Ok(());
    }
    Err(BurnerError::Cluster(format!(
        "failed to {} on {} of {} nodes: {}",
        action,
        failed.len(),
        nodes.len(),
        failed.join(", ")
    )))
}
