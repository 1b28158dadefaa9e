//! Node leases
//!
//! A lease is the lease label applied to a chosen subset of eligible workers
//! for the duration of one run. Acquisition either labels every selected node
//! or none of them; release removes the label key from exactly the nodes that
//! were leased, never from a fresh probe of the cluster.

use crate::cluster::{ClusterControlPlane, ClusterStateProbe};
use crate::error::{BurnerError, CapacityError, Result};
use crate::models::{LeaseLabel, NodeLease, NodeSet};
use futures::FutureExt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{info, warn};

/// Result of a body run under a lease, plus the outcome of releasing it
#[derive(Debug)]
pub struct Scoped<T> {
    pub value: T,
    pub release: Result<()>,
}

/// Selects, labels and unlabels worker nodes
#[derive(Clone)]
pub struct NodeLeaseManager {
    probe: ClusterStateProbe,
    plane: Arc<dyn ClusterControlPlane>,
}

impl NodeLeaseManager {
    pub fn new(probe: ClusterStateProbe, plane: Arc<dyn ClusterControlPlane>) -> Self {
        Self { probe, plane }
    }

    /// Lease `node_count` eligible workers (0 = all of them)
    pub async fn acquire(&self, label: &LeaseLabel, node_count: usize) -> Result<NodeLease> {
        let eligible = self.probe.list_eligible_workers().await?;
        let selected = select_nodes(&eligible, node_count)?;

        if let Err(err) = self
            .plane
            .label_nodes(&selected, &label.key, &label.value)
            .await
        {
            // Some nodes may carry the label already; strip it from the whole selection
            if let Err(rollback) = self.plane.unlabel_nodes(&selected, &label.key).await {
                warn!(
                    nodes = %selected,
                    label_key = %label.key,
                    error = %rollback,
                    "Failed to roll back partially applied lease label"
                );
            }
            return Err(err);
        }

        info!(nodes = %selected, label = %label, "Lease acquired");
        Ok(NodeLease {
            label: label.clone(),
            leased_nodes: selected,
        })
    }

    /// Remove the lease label key from exactly the leased nodes
    ///
    /// Safe to call repeatedly, and on names that were never labelled.
    pub async fn release(&self, lease: &NodeLease) -> Result<()> {
        if lease.leased_nodes.is_empty() {
            return Ok(());
        }
        self.plane
            .unlabel_nodes(&lease.leased_nodes, &lease.label.key)
            .await?;
        info!(nodes = %lease.leased_nodes, label_key = %lease.label.key, "Lease released");
        Ok(())
    }

    /// Run `body` under an already acquired lease, releasing it on every exit
    ///
    /// A panic inside `body` is caught, the lease is released, and the panic
    /// resumes afterwards.
    pub async fn scoped<F, Fut, T>(&self, lease: NodeLease, body: F) -> Scoped<T>
    where
        F: FnOnce(NodeLease) -> Fut,
        Fut: Future<Output = T>,
    {
        let outcome = AssertUnwindSafe(body(lease.clone())).catch_unwind().await;
        let release = self.release(&lease).await;

        match outcome {
            Ok(value) => Scoped { value, release },
            Err(payload) => {
                if let Err(err) = &release {
                    warn!(nodes = %lease.leased_nodes, error = %err, "Lease release failed while unwinding");
                }
                panic::resume_unwind(payload)
            }
        }
    }
}

/// First `node_count` eligible nodes in probe order, or all when 0
pub fn select_nodes(eligible: &NodeSet, node_count: usize) -> Result<NodeSet> {
    if eligible.is_empty() {
        return Err(BurnerError::Capacity(CapacityError::NoEligibleNodes));
    }
    if node_count > eligible.len() {
        return Err(BurnerError::Capacity(CapacityError::InsufficientNodes {
            requested: node_count,
            available: eligible.len(),
        }));
    }
    if node_count == 0 {
        return Ok(eligible.clone());
    }
    Ok(eligible.take_first(node_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::RoleFilter;
    use crate::testing::{FakeControlPlane, PlaneCall};

    fn manager(plane: &Arc<FakeControlPlane>) -> NodeLeaseManager {
        let dyn_plane: Arc<dyn ClusterControlPlane> = plane.clone();
        NodeLeaseManager::new(
            ClusterStateProbe::new(dyn_plane.clone(), RoleFilter::default()),
            dyn_plane,
        )
    }

    #[tokio::test]
    async fn test_acquire_takes_first_nodes_in_probe_order() {
        let plane = Arc::new(FakeControlPlane::with_workers(&["n1", "n2", "n3", "n4", "n5"]));
        let leases = manager(&plane);

        let lease = leases.acquire(&LeaseLabel::default(), 3).await.unwrap();
        assert_eq!(lease.leased_nodes.as_slice(), &["n1", "n2", "n3"]);
        assert!(plane.has_label("n1", "node-density"));
        assert!(plane.has_label("n3", "node-density"));
        assert!(!plane.has_label("n4", "node-density"));
    }

    #[tokio::test]
    async fn test_acquire_zero_leases_all() {
        let plane = Arc::new(FakeControlPlane::with_workers(&["n1", "n2"]));
        let lease = manager(&plane).acquire(&LeaseLabel::default(), 0).await.unwrap();
        assert_eq!(lease.leased_nodes.len(), 2);
    }

    #[tokio::test]
    async fn test_insufficient_nodes_makes_no_label_call() {
        let plane = Arc::new(FakeControlPlane::with_workers(&["n1", "n2"]));
        let err = manager(&plane)
            .acquire(&LeaseLabel::default(), 3)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BurnerError::Capacity(CapacityError::InsufficientNodes {
                requested: 3,
                available: 2
            })
        ));
        assert!(!plane
            .calls()
            .iter()
            .any(|c| matches!(c, PlaneCall::Label { .. })));
    }

    #[tokio::test]
    async fn test_no_eligible_nodes() {
        let plane = Arc::new(FakeControlPlane::with_workers(&[]));
        plane.add_node("infra-0", &["worker", "infra"]);
        let err = manager(&plane)
            .acquire(&LeaseLabel::default(), 0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BurnerError::Capacity(CapacityError::NoEligibleNodes)
        ));
    }

    #[tokio::test]
    async fn test_partial_label_failure_rolls_back() {
        let plane = Arc::new(FakeControlPlane::with_workers(&["n1", "n2", "n3"]));
        plane.fail_label_on("n3");
        let leases = manager(&plane);

        assert!(leases.acquire(&LeaseLabel::default(), 3).await.is_err());
        for node in ["n1", "n2", "n3"] {
            assert!(!plane.has_label(node, "node-density"), "{} kept the label", node);
        }
    }

    #[tokio::test]
    async fn test_release_clears_key_and_is_idempotent() {
        let plane = Arc::new(FakeControlPlane::with_workers(&["n1", "n2", "n3"]));
        let leases = manager(&plane);

        let lease = leases.acquire(&LeaseLabel::default(), 2).await.unwrap();
        leases.release(&lease).await.unwrap();
        for node in lease.leased_nodes.iter() {
            assert!(!plane.has_label(node, "node-density"));
        }

        leases.release(&lease).await.unwrap();

        let never_acquired = NodeLease {
            label: LeaseLabel::default(),
            leased_nodes: ["ghost"].into_iter().collect(),
        };
        leases.release(&never_acquired).await.unwrap();
    }

    #[tokio::test]
    async fn test_release_clears_remaining_nodes_when_one_fails() {
        let plane = Arc::new(FakeControlPlane::with_workers(&["n1", "n2", "n3"]));
        let leases = manager(&plane);
        let lease = leases.acquire(&LeaseLabel::default(), 3).await.unwrap();
        plane.fail_unlabel_on("n2");

        let err = leases.release(&lease).await.unwrap_err();

        assert!(err.to_string().contains("n2"));
        assert!(!plane.has_label("n1", "node-density"));
        assert!(plane.has_label("n2", "node-density"));
        assert!(!plane.has_label("n3", "node-density"));
    }

    #[tokio::test]
    async fn test_release_is_value_agnostic() {
        let plane = Arc::new(FakeControlPlane::with_workers(&["n1"]));
        plane.set_label("n1", "node-density", "something-else");
        let lease = NodeLease {
            label: LeaseLabel::default(),
            leased_nodes: ["n1"].into_iter().collect(),
        };
        manager(&plane).release(&lease).await.unwrap();
        assert!(!plane.has_label("n1", "node-density"));
    }

    #[tokio::test]
    async fn test_release_uses_acquired_set_not_live_state() {
        let plane = Arc::new(FakeControlPlane::with_workers(&["n1", "n2", "n3"]));
        let leases = manager(&plane);
        let lease = leases.acquire(&LeaseLabel::default(), 2).await.unwrap();

        // A node joining mid-run must not be touched by release
        plane.add_node("n0", &["worker"]);
        plane.set_label("n0", "node-density", "enabled");
        leases.release(&lease).await.unwrap();

        assert!(plane.has_label("n0", "node-density"));
        let unlabelled = plane.unlabel_calls();
        assert_eq!(unlabelled.len(), 1);
        assert_eq!(unlabelled[0].as_slice(), &["n1", "n2"]);
    }

    #[tokio::test]
    async fn test_scoped_releases_on_panic() {
        let plane = Arc::new(FakeControlPlane::with_workers(&["n1"]));
        let leases = manager(&plane);
        let lease = leases.acquire(&LeaseLabel::default(), 1).await.unwrap();

        let handle = tokio::spawn({
            let leases = leases.clone();
            async move {
                leases
                    .scoped(lease, |_lease| async move {
                        panic!("engine blew up");
                    })
                    .await
            }
        });

        let joined: std::result::Result<Scoped<()>, _> = handle.await;
        assert!(joined.unwrap_err().is_panic());
        assert!(!plane.has_label("n1", "node-density"));
    }
}
