//! Per-variant benchmark operations
//!
//! Each operation walks the same linear state machine:
//!
//! ```text
//! Idle -> Probing -> (Leasing) -> Planning -> ConfigBuilding -> Running -> (Releasing) -> Done
//! ```
//!
//! Leasing and releasing only happen for the node-density family. Every step
//! failure is folded into a [`RunResult::Failure`]; once a lease is held it
//! is released before the result is reported.

mod params;


pub use params::{
    ClusterDensityParams, CommonParams, IndexerParams, NodeDensityParams, PodDensityParams,
    DEFAULT_ES_INDEX, DEFAULT_ES_SERVER, DEFAULT_POD_NODE_SELECTOR,
};

use crate::cluster::{ClusterControlPlane, ClusterStateProbe, RoleFilter};
use crate::credentials::CredentialProvider;
use crate::error::{BurnerError, Result};
use crate::lease::NodeLeaseManager;
use crate::models::{CapacityRequest, Credentials, LeaseLabel, NodeLease, RunResult, WorkloadVariant};
use crate::observability::{RunMetrics, RunPhase, StructuredLogger};
use crate::planner;
use crate::runner::{BenchmarkEngine, EngineMode, WorkloadRunner};
use crate::workload::{self, Field, NodeSelector, RunOverrides, TemplateStore};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// External collaborators an [`Orchestrator`] drives
#[derive(Clone)]
pub struct Collaborators {
    pub plane: Arc<dyn ClusterControlPlane>,
    pub credentials: Arc<dyn CredentialProvider>,
    pub templates: Arc<dyn TemplateStore>,
    pub engine: Arc<dyn BenchmarkEngine>,
}

/// Orchestrator-level settings
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub lease_label: LeaseLabel,
    pub role_filter: RoleFilter,
    pub metrics_profile: PathBuf,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            lease_label: LeaseLabel::default(),
            role_filter: RoleFilter::default(),
            metrics_profile: PathBuf::from("templates/metrics.yml"),
        }
    }
}

pub struct Orchestrator {
    probe: ClusterStateProbe,
    leases: NodeLeaseManager,
    credentials: Arc<dyn CredentialProvider>,
    templates: Arc<dyn TemplateStore>,
    runner: WorkloadRunner,
    lease_label: LeaseLabel,
    metrics: RunMetrics,
}

impl Orchestrator {
    pub fn new(collaborators: Collaborators, config: OrchestratorConfig) -> Self {
        let probe = ClusterStateProbe::new(collaborators.plane.clone(), config.role_filter);
        let leases = NodeLeaseManager::new(probe.clone(), collaborators.plane);
        Self {
            probe,
            leases,
            credentials: collaborators.credentials,
            templates: collaborators.templates,
            runner: WorkloadRunner::new(collaborators.engine, config.metrics_profile),
            lease_label: config.lease_label,
            metrics: RunMetrics::new(),
        }
    }

    /// Index monitoring metrics collected over the last `collection_time` minutes
    pub async fn run_indexer(&self, run_id: Uuid, params: &IndexerParams) -> RunResult {
        let variant = WorkloadVariant::Indexer;
        let logger = StructuredLogger::new(variant, run_id);
        logger.log_phase(RunPhase::Idle);

        let result = self.index(&logger, run_id, params).await;
        self.finish(&logger, variant, result)
    }

    /// Pod density: a flat iteration count on the selected nodes
    pub async fn run_pod_density(&self, run_id: Uuid, params: &PodDensityParams) -> RunResult {
        let variant = WorkloadVariant::PodDensity;
        let logger = StructuredLogger::new(variant, run_id);
        logger.log_phase(RunPhase::Idle);

        let result = self
            .run_flat(
                &logger,
                run_id,
                variant,
                &params.common,
                params.job_iterations,
                &params.pod_node_selector,
            )
            .await;
        self.finish(&logger, variant, result)
    }

    /// Cluster density: a flat iteration count of mixed resources
    pub async fn run_cluster_density(
        &self,
        run_id: Uuid,
        params: &ClusterDensityParams,
    ) -> RunResult {
        let variant = WorkloadVariant::ClusterDensity;
        let logger = StructuredLogger::new(variant, run_id);
        logger.log_phase(RunPhase::Idle);

        let result = self
            .run_flat(
                &logger,
                run_id,
                variant,
                &params.common,
                params.job_iterations,
                &params.pod_node_selector,
            )
            .await;
        self.finish(&logger, variant, result)
    }

    pub async fn run_node_density(&self, run_id: Uuid, params: &NodeDensityParams) -> RunResult {
        self.run_leased(run_id, WorkloadVariant::NodeDensity, params)
            .await
    }

    pub async fn run_node_density_heavy(
        &self,
        run_id: Uuid,
        params: &NodeDensityParams,
    ) -> RunResult {
        self.run_leased(run_id, WorkloadVariant::NodeDensityHeavy, params)
            .await
    }

    pub async fn run_node_density_cni(&self, run_id: Uuid, params: &NodeDensityParams) -> RunResult {
        self.run_leased(run_id, WorkloadVariant::NodeDensityCni, params)
            .await
    }

    async fn index(
        &self,
        logger: &StructuredLogger,
        run_id: Uuid,
        params: &IndexerParams,
    ) -> Result<RunResult> {
        let variant = WorkloadVariant::Indexer;
        logger.log_phase(RunPhase::Probing);
        let credentials = self.credentials.monitoring_endpoint().await?;

        logger.log_phase(RunPhase::ConfigBuilding);
        let overrides = RunOverrides::new()
            .list(Field::IndexerServers, &[params.es_server.clone()])
            .text(Field::DefaultIndex, params.es_index.as_str())
            .flag(Field::IndexingEnabled, true)
            .flag(Field::WriteToFile, params.write_to_file);
        let config_path = self.build_config(logger, run_id, variant, &overrides).await?;

        let end = chrono::Utc::now().timestamp();
        let start = end - i64::from(params.collection_time) * 60;

        logger.log_phase(RunPhase::Running);
        Ok(self
            .runner
            .run(
                run_id,
                &config_path,
                &credentials,
                &params.job_name,
                EngineMode::Index { start, end },
            )
            .await)
    }

    async fn run_flat(
        &self,
        logger: &StructuredLogger,
        run_id: Uuid,
        variant: WorkloadVariant,
        common: &CommonParams,
        job_iterations: u64,
        pod_node_selector: &str,
    ) -> Result<RunResult> {
        logger.log_phase(RunPhase::Probing);
        let credentials = self.credentials.monitoring_endpoint().await?;

        logger.log_phase(RunPhase::ConfigBuilding);
        let selector: NodeSelector = pod_node_selector.parse()?;
        let overrides = common_overrides(run_id, variant, common)
            .count(Field::JobIterations, job_iterations)
            .node_selector(selector);
        let config_path = self.build_config(logger, run_id, variant, &overrides).await?;

        logger.log_phase(RunPhase::Running);
        Ok(self
            .runner
            .run(run_id, &config_path, &credentials, variant.as_str(), EngineMode::Init)
            .await)
    }

    async fn run_leased(
        &self,
        run_id: Uuid,
        variant: WorkloadVariant,
        params: &NodeDensityParams,
    ) -> RunResult {
        let logger = StructuredLogger::new(variant, run_id);
        logger.log_phase(RunPhase::Idle);

        // Credentials before any label is applied
        logger.log_phase(RunPhase::Probing);
        let credentials = match self.credentials.monitoring_endpoint().await {
            Ok(credentials) => credentials,
            Err(err) => return self.finish(&logger, variant, Err(err)),
        };

        logger.log_phase(RunPhase::Leasing);
        let lease = match self.leases.acquire(&self.lease_label, params.node_count).await {
            Ok(lease) => lease,
            Err(err) => return self.finish(&logger, variant, Err(err)),
        };
        logger.log_lease_acquired(&lease);
        self.metrics
            .set_leased_nodes(variant, lease.leased_nodes.len());

        let body_logger = &logger;
        let credentials = &credentials;
        let scoped = self
            .leases
            .scoped(lease.clone(), |lease| async move {
                let outcome = self
                    .run_on_lease(body_logger, run_id, variant, params, &lease, credentials)
                    .await;
                body_logger.log_phase(RunPhase::Releasing);
                outcome
            })
            .await;

        let result = match scoped.release {
            Ok(()) => {
                logger.log_lease_released(&lease);
                self.metrics.set_leased_nodes(variant, 0);
                scoped.value
            }
            Err(release_err) => {
                logger.log_lease_release_failed(&lease, &release_err.to_string());
                self.metrics.inc_lease_release_failures(variant);
                match scoped.value {
                    // A clean run that leaves labels behind is still a failure
                    Ok(RunResult::Success { run_id, .. }) => Ok(RunResult::Failure {
                        exit_code: release_err.exit_code(),
                        message: format!(
                            "run {} completed but releasing the lease on {} failed: {}",
                            run_id, lease.leased_nodes, release_err
                        ),
                    }),
                    first => first,
                }
            }
        };

        self.finish(&logger, variant, result)
    }

    async fn run_on_lease(
        &self,
        logger: &StructuredLogger,
        run_id: Uuid,
        variant: WorkloadVariant,
        params: &NodeDensityParams,
        lease: &NodeLease,
        credentials: &Credentials,
    ) -> Result<RunResult> {
        logger.log_phase(RunPhase::Planning);
        let already_running = self.probe.running_on(&lease.leased_nodes).await?;
        let request = CapacityRequest {
            node_count: lease.leased_nodes.len() as u64,
            pods_per_node: params.pods_per_node,
            already_running_on_target: already_running,
            variant,
        };
        let deploy_count = planner::plan(&request)?;
        logger.log_capacity_planned(
            request.node_count,
            request.pods_per_node,
            already_running,
            deploy_count,
        );
        self.metrics.set_deploy_count(variant, deploy_count);

        logger.log_phase(RunPhase::ConfigBuilding);
        let overrides = common_overrides(run_id, variant, &params.common)
            .count(Field::JobIterations, deploy_count)
            .node_selector(NodeSelector::from_label(&lease.label));
        let config_path = self.build_config(logger, run_id, variant, &overrides).await?;

        logger.log_phase(RunPhase::Running);
        Ok(self
            .runner
            .run(run_id, &config_path, credentials, variant.as_str(), EngineMode::Init)
            .await)
    }

    /// Load the variant template, apply `overrides`, and write the result once
    async fn build_config(
        &self,
        logger: &StructuredLogger,
        run_id: Uuid,
        variant: WorkloadVariant,
        overrides: &RunOverrides,
    ) -> Result<PathBuf> {
        let template = self.templates.load_template(variant).await?;
        let config = workload::build(&template, variant, overrides)?;
        let path = self
            .templates
            .persist(&config, &run_scoped_name(variant, run_id))
            .await?;
        logger.log_config_built(&path.display().to_string());
        Ok(path)
    }

    fn finish(
        &self,
        logger: &StructuredLogger,
        variant: WorkloadVariant,
        result: Result<RunResult>,
    ) -> RunResult {
        let result = match result {
            Ok(result) => result,
            Err(err) => {
                self.metrics.record_failure_kind(variant.as_str(), err.kind());
                failure(err)
            }
        };
        logger.log_phase(RunPhase::Done);
        logger.log_run_finished(&result);
        self.metrics.record_run(variant, &result);
        result
    }
}

/// `<job>-<uuid>`, used for both the namespace and the persisted config name
pub fn run_scoped_name(variant: WorkloadVariant, run_id: Uuid) -> String {
    format!("{}-{}", variant.as_str(), run_id)
}

fn failure(err: BurnerError) -> RunResult {
    RunResult::Failure {
        exit_code: err.exit_code(),
        message: err.to_string(),
    }
}

fn common_overrides(run_id: Uuid, variant: WorkloadVariant, common: &CommonParams) -> RunOverrides {
    RunOverrides::new()
        .list(Field::IndexerServers, &[common.es_server.clone()])
        .text(Field::DefaultIndex, common.es_index.as_str())
        .flag(Field::IndexingEnabled, common.indexing)
        .flag(Field::WriteToFile, common.write_to_file)
        .text(Field::MeasurementThreshold, common.pod_ready_threshold.as_str())
        .count(Field::Qps, u64::from(common.qps))
        .count(Field::Burst, u64::from(common.burst))
        .text(Field::Namespace, run_scoped_name(variant, run_id))
        .flag(Field::NamespacedIterations, common.namespaced_iterations)
        .flag(Field::PodWait, common.pod_wait)
        .flag(Field::Cleanup, common.cleanup)
        .list(Field::WaitFor, &common.wait_for)
        .flag(Field::WaitWhenFinished, common.wait_when_finished)
        .flag(Field::VerifyObjects, common.verify_objects)
        .flag(Field::ErrorOnVerify, common.error_on_verify)
        .text(Field::MaxWaitTimeout, common.max_wait_timeout.as_str())
        .flag(Field::PreloadImages, common.preload_images)
        .text(Field::PreloadPeriod, common.preload_period.as_str())
}
