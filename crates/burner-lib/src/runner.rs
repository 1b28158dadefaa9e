//! Benchmark engine invocation
//!
//! The engine is an opaque executable. [`WorkloadRunner`] turns one
//! invocation into a [`RunResult`]; how the engine is started is behind the
//! [`BenchmarkEngine`] seam.

use crate::error::{BurnerError, Result};
use crate::models::{Credentials, RunResult};
use crate::observability::RunMetrics;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, info};
use uuid::Uuid;

/// Exit code reported when the engine binary cannot be started
const SPAWN_FAILURE_EXIT_CODE: i32 = 127;

/// Engine sub-command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    /// Create the workload described by the config
    Init,
    /// Index metrics collected between two unix timestamps
    Index { start: i64, end: i64 },
}

/// Everything the engine needs for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineInvocation {
    pub mode: EngineMode,
    pub config_path: PathBuf,
    pub run_id: Uuid,
    pub credentials: Credentials,
    pub job_name: String,
    pub metrics_profile: PathBuf,
}

impl EngineInvocation {
    /// Command-line arguments, token included
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            match self.mode {
                EngineMode::Init => "init".to_string(),
                EngineMode::Index { .. } => "index".to_string(),
            },
            "-c".to_string(),
            self.config_path.display().to_string(),
            format!("--uuid={}", self.run_id),
            format!("-u={}", self.credentials.endpoint),
            format!("--token={}", self.credentials.token),
            format!("-m={}", self.metrics_profile.display()),
        ];

        if let EngineMode::Index { start, end } = self.mode {
            args.extend([
                "--job-name".to_string(),
                self.job_name.clone(),
                "--start".to_string(),
                start.to_string(),
                "--end".to_string(),
                end.to_string(),
            ]);
        }

        args
    }
}

/// Raw engine outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOutput {
    pub exit_code: i32,
    /// stdout followed by stderr
    pub output: String,
}

#[async_trait]
pub trait BenchmarkEngine: Send + Sync {
    /// Run to completion; a non-zero exit is reported in the output, not as an error
    async fn execute(&self, invocation: &EngineInvocation) -> Result<EngineOutput>;

    /// Name used in failure messages
    fn command_name(&self) -> String {
        "kube-burner".to_string()
    }
}

/// Engine started as a child process
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    binary: PathBuf,
}

impl ProcessEngine {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl BenchmarkEngine for ProcessEngine {
    async fn execute(&self, invocation: &EngineInvocation) -> Result<EngineOutput> {
        debug!(
            binary = %self.binary.display(),
            config = %invocation.config_path.display(),
            run_id = %invocation.run_id,
            "Starting benchmark engine"
        );

        let output = Command::new(&self.binary)
            .args(invocation.args())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| BurnerError::ExternalProcess {
                command: self.command_name(),
                exit_code: SPAWN_FAILURE_EXIT_CODE,
                output: format!("failed to start {}: {}", self.binary.display(), e),
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(EngineOutput {
            // Killed by a signal
            exit_code: output.status.code().unwrap_or(-1),
            output: combined,
        })
    }

    fn command_name(&self) -> String {
        self.binary
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.binary.display().to_string())
    }
}

/// Drives the engine and folds its outcome into a [`RunResult`]
#[derive(Clone)]
pub struct WorkloadRunner {
    engine: Arc<dyn BenchmarkEngine>,
    metrics_profile: PathBuf,
    metrics: RunMetrics,
}

impl WorkloadRunner {
    pub fn new(engine: Arc<dyn BenchmarkEngine>, metrics_profile: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            metrics_profile: metrics_profile.into(),
            metrics: RunMetrics::new(),
        }
    }

    pub async fn run(
        &self,
        run_id: Uuid,
        config_path: &Path,
        credentials: &Credentials,
        job_name: &str,
        mode: EngineMode,
    ) -> RunResult {
        let invocation = EngineInvocation {
            mode,
            config_path: config_path.to_path_buf(),
            run_id,
            credentials: credentials.clone(),
            job_name: job_name.to_string(),
            metrics_profile: self.metrics_profile.clone(),
        };

        info!(job = %job_name, run_id = %run_id, config = %config_path.display(), "Running benchmark engine");
        let started = Instant::now();
        let outcome = self.engine.execute(&invocation).await;
        self.metrics
            .observe_engine_duration(job_name, started.elapsed().as_secs_f64());

        let err = match outcome {
            Ok(EngineOutput { exit_code: 0, output }) => return RunResult::Success { run_id, output },
            Ok(EngineOutput { exit_code, output }) => BurnerError::ExternalProcess {
                command: self.engine.command_name(),
                exit_code,
                output,
            },
            Err(err) => err,
        };

        self.metrics.record_failure_kind(job_name, err.kind());
        RunResult::Failure {
            exit_code: err.exit_code(),
            message: err.to_string(),
        }
    }
}
