//! Configuration management for the CLI

use anyhow::{Context, Result};
use burner_lib::cluster::RoleFilter;
use burner_lib::credentials::MonitoringTarget;
use burner_lib::LeaseLabel;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable prefix; nested keys use `__`
const ENV_PREFIX: &str = "BURNER";

/// CLI settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Benchmark engine executable
    #[serde(default = "default_engine_path")]
    pub engine_path: PathBuf,

    /// Metrics profile handed to the engine
    #[serde(default = "default_metrics_profile")]
    pub metrics_profile: PathBuf,

    /// Directory holding one template per variant
    #[serde(default = "default_template_dir")]
    pub template_dir: PathBuf,

    /// Where per-run configs are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Lease label as `key=value`
    #[serde(default = "default_lease_label")]
    pub lease_label: String,

    #[serde(default = "default_worker_role")]
    pub worker_role: String,

    #[serde(default = "default_excluded_roles")]
    pub excluded_roles: Vec<String>,

    #[serde(default = "default_monitoring_namespace")]
    pub monitoring_namespace: String,

    #[serde(default = "default_monitoring_route")]
    pub monitoring_route: String,

    #[serde(default = "default_monitoring_service_account")]
    pub monitoring_service_account: String,

    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: i64,

    /// Fixed monitoring endpoint; skips route lookup when set with a token
    #[serde(default)]
    pub prometheus_url: Option<String>,

    #[serde(default)]
    pub prometheus_token: Option<String>,

    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,
}

fn default_engine_path() -> PathBuf {
    PathBuf::from("kube-burner")
}

fn default_metrics_profile() -> PathBuf {
    PathBuf::from("templates/metrics.yml")
}

fn default_template_dir() -> PathBuf {
    PathBuf::from("templates")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("runs")
}

fn default_lease_label() -> String {
    LeaseLabel::default().to_string()
}

fn default_worker_role() -> String {
    "worker".to_string()
}

fn default_excluded_roles() -> Vec<String> {
    vec!["infra".to_string(), "workload".to_string()]
}

fn default_monitoring_namespace() -> String {
    MonitoringTarget::default().namespace
}

fn default_monitoring_route() -> String {
    MonitoringTarget::default().route
}

fn default_monitoring_service_account() -> String {
    MonitoringTarget::default().service_account
}

fn default_token_ttl() -> i64 {
    MonitoringTarget::default().token_ttl_secs
}

impl Settings {
    /// Load settings from the config file and `BURNER_*` environment
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        builder = match path {
            Some(path) => builder.add_source(config::File::from(path).required(true)),
            None => match Self::default_path() {
                Some(default) => builder.add_source(
                    config::File::with_name(&default.display().to_string()).required(false),
                ),
                None => builder,
            },
        };

        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("excluded_roles"),
            )
            .build()
            .context("Failed to read settings")?;

        config
            .try_deserialize()
            .context("Failed to parse settings")
    }

    /// `~/.config/burnerctl/config`, any supported extension
    fn default_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("burnerctl").join("config"))
    }

    pub fn lease_label(&self) -> Result<LeaseLabel> {
        self.lease_label
            .parse()
            .with_context(|| format!("Invalid lease_label '{}'", self.lease_label))
    }

    pub fn role_filter(&self) -> RoleFilter {
        RoleFilter::new(vec![self.worker_role.clone()], self.excluded_roles.clone())
    }

    pub fn monitoring_target(&self) -> MonitoringTarget {
        MonitoringTarget {
            namespace: self.monitoring_namespace.clone(),
            route: self.monitoring_route.clone(),
            service_account: self.monitoring_service_account.clone(),
            token_ttl_secs: self.token_ttl_secs,
        }
    }

    /// Endpoint and token, when both are configured
    pub fn static_monitoring(&self) -> Option<(&str, &str)> {
        match (&self.prometheus_url, &self.prometheus_token) {
            (Some(url), Some(token)) => Some((url.as_str(), token.as_str())),
            _ => None,
        }
    }
}
