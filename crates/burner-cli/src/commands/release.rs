//! Operator lease release
//!
//! Recovery path for runs that were interrupted before their lease was
//! released: strips the lease label key from an explicit node list.

use crate::output::{print_error, print_release, OutputFormat};
use burner_lib::lease::NodeLeaseManager;
use burner_lib::{LeaseLabel, NodeLease, NodeSet};

/// Release `nodes`; returns the process exit code
pub async fn release_nodes(
    leases: &NodeLeaseManager,
    nodes: Vec<String>,
    label: LeaseLabel,
    format: OutputFormat,
) -> i32 {
    let lease = NodeLease {
        label,
        leased_nodes: nodes
            .into_iter()
            .map(|node| node.trim().to_string())
            .filter(|node| !node.is_empty())
            .collect::<NodeSet>(),
    };

    match leases.release(&lease).await {
        Ok(()) => {
            print_release(&lease, format);
            0
        }
        Err(err) => {
            print_error(&format!(
                "Failed to release {} from {}: {}",
                lease.label.key, lease.leased_nodes, err
            ));
            err.exit_code()
        }
    }
}
