//! Live cluster state queries

use super::{ClusterControlPlane, RoleFilter};
use crate::error::Result;
use crate::models::NodeSet;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Read-only view of eligible workers and pod occupancy
///
/// Every call hits the control plane; nothing is cached between runs.
#[derive(Clone)]
pub struct ClusterStateProbe {
    plane: Arc<dyn ClusterControlPlane>,
    filter: RoleFilter,
}

impl ClusterStateProbe {
    pub fn new(plane: Arc<dyn ClusterControlPlane>, filter: RoleFilter) -> Self {
        Self { plane, filter }
    }

    pub fn filter(&self) -> &RoleFilter {
        &self.filter
    }

    /// Eligible worker nodes in the order the control plane listed them
    pub async fn list_eligible_workers(&self) -> Result<NodeSet> {
        let nodes: NodeSet = self
            .plane
            .list_nodes(&self.filter)
            .await?
            .into_iter()
            .filter(|name| !name.trim().is_empty())
            .collect();
        debug!(selector = %self.filter.label_selector(), count = nodes.len(), "Listed eligible workers");
        Ok(nodes)
    }

    /// Snapshot of running pods per node
    pub async fn running_pod_count_by_node(&self) -> Result<HashMap<String, u64>> {
        self.plane.running_pods_by_node().await
    }

    /// Running pods currently scheduled on any node of `nodes`
    pub async fn running_on(&self, nodes: &NodeSet) -> Result<u64> {
        let by_node = self.running_pod_count_by_node().await?;
        Ok(sum_for(&by_node, nodes))
    }
}

fn sum_for(by_node: &HashMap<String, u64>, nodes: &NodeSet) -> u64 {
    nodes
        .iter()
        .filter_map(|name| by_node.get(name))
        .sum()
}
