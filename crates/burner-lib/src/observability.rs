//! Observability for orchestrated runs
//!
//! Provides:
//! - Prometheus metrics (runs by outcome, failures by error kind, leased nodes,
//!   deploy count, engine duration)
//! - Structured logging of run lifecycle events with tracing

use crate::models::{NodeLease, RunResult, WorkloadVariant};
use prometheus::{
    register_gauge_vec, register_histogram_vec, register_int_counter_vec, register_int_gauge_vec,
    Encoder, GaugeVec, HistogramVec, IntCounterVec, IntGaugeVec, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};
use uuid::Uuid;

/// Engine runs last minutes to hours
const ENGINE_DURATION_BUCKETS: &[f64] = &[
    10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1200.0, 1800.0, 3600.0, 7200.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<RunMetricsInner> = OnceLock::new();

struct RunMetricsInner {
    runs_total: IntCounterVec,
    leased_nodes: IntGaugeVec,
    deploy_count: IntGaugeVec,
    engine_duration_seconds: HistogramVec,
    lease_release_failures: IntCounterVec,
    run_failures: IntCounterVec,
    last_run_timestamp: GaugeVec,
}

impl RunMetricsInner {
    fn new() -> Self {
        Self {
            runs_total: register_int_counter_vec!(
                "burner_runs_total",
                "Orchestrated benchmark runs by variant and outcome",
                &["variant", "outcome"]
            )
            .expect("Failed to register runs_total"),

            leased_nodes: register_int_gauge_vec!(
                "burner_leased_nodes",
                "Nodes carrying the lease label for the current run",
                &["variant"]
            )
            .expect("Failed to register leased_nodes"),

            deploy_count: register_int_gauge_vec!(
                "burner_deploy_count",
                "Pods the last planned run had to create",
                &["variant"]
            )
            .expect("Failed to register deploy_count"),

            engine_duration_seconds: register_histogram_vec!(
                "burner_engine_duration_seconds",
                "Wall time of benchmark engine invocations",
                &["job"],
                ENGINE_DURATION_BUCKETS.to_vec()
            )
            .expect("Failed to register engine_duration_seconds"),

            lease_release_failures: register_int_counter_vec!(
                "burner_lease_release_failures_total",
                "Lease releases that failed and left labels behind",
                &["variant"]
            )
            .expect("Failed to register lease_release_failures"),

            run_failures: register_int_counter_vec!(
                "burner_run_failures_total",
                "Failed runs by job and error kind",
                &["job", "kind"]
            )
            .expect("Failed to register run_failures"),

            last_run_timestamp: register_gauge_vec!(
                "burner_last_run_timestamp_seconds",
                "Unix time the last run of each variant finished",
                &["variant"]
            )
            .expect("Failed to register last_run_timestamp"),
        }
    }
}

/// Handle to the process-wide run metrics
///
/// Clones share the same underlying metrics.
#[derive(Clone)]
pub struct RunMetrics {
    _private: (),
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RunMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(RunMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &RunMetricsInner {
        GLOBAL_METRICS.get_or_init(RunMetricsInner::new)
    }

    pub fn record_run(&self, variant: WorkloadVariant, result: &RunResult) {
        let inner = self.inner();
        inner
            .runs_total
            .with_label_values(&[variant.as_str(), result.outcome_label()])
            .inc();
        inner
            .last_run_timestamp
            .with_label_values(&[variant.as_str()])
            .set(chrono::Utc::now().timestamp() as f64);
    }

    pub fn set_leased_nodes(&self, variant: WorkloadVariant, count: usize) {
        self.inner()
            .leased_nodes
            .with_label_values(&[variant.as_str()])
            .set(count as i64);
    }

    pub fn set_deploy_count(&self, variant: WorkloadVariant, count: u64) {
        self.inner()
            .deploy_count
            .with_label_values(&[variant.as_str()])
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    pub fn observe_engine_duration(&self, job: &str, duration_secs: f64) {
        self.inner()
            .engine_duration_seconds
            .with_label_values(&[job])
            .observe(duration_secs);
    }

    pub fn inc_lease_release_failures(&self, variant: WorkloadVariant) {
        self.inner()
            .lease_release_failures
            .with_label_values(&[variant.as_str()])
            .inc();
    }

    pub fn record_failure_kind(&self, job: &str, kind: &str) {
        self.inner()
            .run_failures
            .with_label_values(&[job, kind])
            .inc();
    }

    /// Text exposition of every registered metric
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Orchestrator phase, logged on every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Probing,
    Leasing,
    Planning,
    ConfigBuilding,
    Running,
    Releasing,
    Done,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Probing => "probing",
            RunPhase::Leasing => "leasing",
            RunPhase::Planning => "planning",
            RunPhase::ConfigBuilding => "config_building",
            RunPhase::Running => "running",
            RunPhase::Releasing => "releasing",
            RunPhase::Done => "done",
        }
    }
}

/// Structured logger for run events
#[derive(Clone)]
pub struct StructuredLogger {
    variant: WorkloadVariant,
    run_id: Uuid,
}

impl StructuredLogger {
    pub fn new(variant: WorkloadVariant, run_id: Uuid) -> Self {
        Self { variant, run_id }
    }

    pub fn log_phase(&self, phase: RunPhase) {
        info!(
            event = "phase_changed",
            variant = %self.variant,
            run_id = %self.run_id,
            phase = phase.as_str(),
            "Run phase changed"
        );
    }

    pub fn log_lease_acquired(&self, lease: &NodeLease) {
        info!(
            event = "lease_acquired",
            variant = %self.variant,
            run_id = %self.run_id,
            nodes = %lease.leased_nodes,
            node_count = lease.leased_nodes.len(),
            label = %lease.label,
            "Labelled worker nodes for run"
        );
    }

    pub fn log_lease_released(&self, lease: &NodeLease) {
        info!(
            event = "lease_released",
            variant = %self.variant,
            run_id = %self.run_id,
            nodes = %lease.leased_nodes,
            label_key = %lease.label.key,
            "Removed lease label from worker nodes"
        );
    }

    pub fn log_lease_release_failed(&self, lease: &NodeLease, error: &str) {
        warn!(
            event = "lease_release_failed",
            variant = %self.variant,
            run_id = %self.run_id,
            nodes = %lease.leased_nodes,
            label_key = %lease.label.key,
            error = %error,
            "Failed to remove lease label; nodes need manual cleanup"
        );
    }

    pub fn log_capacity_planned(
        &self,
        node_count: u64,
        pods_per_node: u64,
        already_running: u64,
        deploy_count: u64,
    ) {
        info!(
            event = "capacity_planned",
            variant = %self.variant,
            run_id = %self.run_id,
            node_count = node_count,
            pods_per_node = pods_per_node,
            already_running = already_running,
            deploy_count = deploy_count,
            "Number of pods to deploy on nodes"
        );
    }

    pub fn log_config_built(&self, path: &str) {
        info!(
            event = "config_built",
            variant = %self.variant,
            run_id = %self.run_id,
            path = %path,
            "Wrote run configuration"
        );
    }

    pub fn log_run_finished(&self, result: &RunResult) {
        match result {
            RunResult::Success { .. } => info!(
                event = "run_finished",
                variant = %self.variant,
                run_id = %self.run_id,
                outcome = "success",
                "Benchmark run complete"
            ),
            RunResult::Failure { exit_code, message } => warn!(
                event = "run_finished",
                variant = %self.variant,
                run_id = %self.run_id,
                outcome = "failure",
                exit_code = exit_code,
                message = %message,
                "Benchmark run failed"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_metrics_render() {
        let metrics = RunMetrics::new();
        metrics.record_run(
            WorkloadVariant::PodDensity,
            &RunResult::Success {
                run_id: Uuid::nil(),
                output: String::new(),
            },
        );
        metrics.set_deploy_count(WorkloadVariant::NodeDensity, 2450);
        metrics.set_leased_nodes(WorkloadVariant::NodeDensity, 10);
        metrics.observe_engine_duration("pod-density", 42.0);
        metrics.record_failure_kind("node-density", "capacity");

        let text = metrics.render().unwrap();
        assert!(text.contains("burner_runs_total"));
        assert!(text.contains("burner_deploy_count"));
        assert!(text.contains(r#"burner_run_failures_total{job="node-density",kind="capacity"}"#));
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(RunPhase::ConfigBuilding.as_str(), "config_building");
        assert_eq!(RunPhase::Done.as_str(), "done");
    }
}
