//! Density benchmark orchestration for Kubernetes clusters
//!
//! This crate provides the core functionality for:
//! - Capacity planning of node density runs
//! - Leasing worker nodes with a marker label for the length of a run
//! - Building per-run engine configs from immutable templates
//! - Driving the external benchmark engine
//! - Run metrics and structured logging

pub mod cluster;
pub mod credentials;
pub mod error;
pub mod lease;
pub mod models;
pub mod observability;
pub mod orchestrator;
pub mod planner;
pub mod runner;
pub mod workload;

#[cfg(test)]
mod testing;

pub use error::{BurnerError, CapacityError, ConfigError, CredentialError, Result};
pub use models::*;
pub use observability::{RunMetrics, RunPhase, StructuredLogger};
pub use orchestrator::{Collaborators, Orchestrator, OrchestratorConfig};
