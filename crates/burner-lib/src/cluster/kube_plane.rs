//! kube-rs backed control plane

use super::{patch_each, ClusterControlPlane, RoleFilter};
use crate::error::Result;
use crate::models::NodeSet;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::{Client, ResourceExt};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, info};

/// Page size for cluster-wide list calls
const LIST_PAGE_SIZE: u32 = 500;

/// Control plane talking to the Kubernetes API server
#[derive(Clone)]
pub struct KubeControlPlane {
    client: Client,
}

impl KubeControlPlane {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn patch_labels(
        &self,
        nodes: &NodeSet,
        action: &str,
        labels: Value,
        tolerate_missing: bool,
    ) -> Result<()> {
        let api: Api<Node> = Api::all(self.client.clone());
        let patch = json!({ "metadata": { "labels": labels } });

        patch_each(nodes, action, |name| {
            let api = &api;
            let patch = &patch;
            async move {
                match api
                    .patch(&name, &PatchParams::default(), &Patch::Merge(patch))
                    .await
                {
                    Ok(_) => {
                        debug!(node = %name, "Patched node labels");
                        Ok(())
                    }
                    Err(kube::Error::Api(ae)) if tolerate_missing && ae.code == 404 => {
                        debug!(node = %name, "Node no longer exists, skipping");
                        Ok(())
                    }
                    Err(e) => Err(e.to_string()),
                }
            }
        })
        .await
    }
}

#[async_trait]
impl ClusterControlPlane for KubeControlPlane {
    async fn list_nodes(&self, filter: &RoleFilter) -> Result<Vec<String>> {
        let api: Api<Node> = Api::all(self.client.clone());
        let selector = filter.label_selector();
        let mut names = Vec::new();
        let mut continue_token: Option<String> = None;

        loop {
            let mut params = ListParams::default().labels(&selector).limit(LIST_PAGE_SIZE);
            if let Some(token) = &continue_token {
                params = params.continue_token(token);
            }

            let page = api.list(&params).await?;
            names.extend(page.items.iter().map(|node| node.name_any()));

            match page.metadata.continue_ {
                Some(token) if !token.is_empty() => continue_token = Some(token),
                _ => break,
            }
        }

        Ok(names)
    }

    async fn label_nodes(&self, nodes: &NodeSet, key: &str, value: &str) -> Result<()> {
        info!(nodes = %nodes, label = %format!("{}={}", key, value), "Labelling worker nodes");
        self.patch_labels(nodes, "set label", json!({ key: value }), false)
            .await
    }

    async fn unlabel_nodes(&self, nodes: &NodeSet, key: &str) -> Result<()> {
        info!(nodes = %nodes, label_key = %key, "Removing label from worker nodes");
        // A null value in a merge patch deletes the key, and is a no-op when absent
        self.patch_labels(nodes, "remove label", json!({ key: Value::Null }), true)
            .await
    }

    async fn running_pods_by_node(&self) -> Result<HashMap<String, u64>> {
        let api: Api<Pod> = Api::all(self.client.clone());
        let mut counts: HashMap<String, u64> = HashMap::new();
        let mut continue_token: Option<String> = None;

        loop {
            let mut params = ListParams::default()
                .fields("status.phase=Running")
                .limit(LIST_PAGE_SIZE);
            if let Some(token) = &continue_token {
                params = params.continue_token(token);
            }

            let page = api.list(&params).await?;
            for pod in &page.items {
                if let Some(node) = pod.spec.as_ref().and_then(|s| s.node_name.as_ref()) {
                    *counts.entry(node.clone()).or_default() += 1;
                }
            }

            match page.metadata.continue_ {
                Some(token) if !token.is_empty() => continue_token = Some(token),
                _ => break,
            }
        }

        debug!(nodes = counts.len(), "Counted running pods by node");
        Ok(counts)
    }
}
