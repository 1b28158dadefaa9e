//! Template loading and per-run config persistence

use super::document::WorkloadConfig;
use crate::error::{ConfigError, Result};
use crate::models::WorkloadVariant;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Source of variant templates and sink for built run configs
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn load_template(&self, variant: WorkloadVariant) -> Result<WorkloadConfig>;

    /// Write `config` once under a fresh name derived from `file_stem`
    async fn persist(&self, config: &WorkloadConfig, file_stem: &str) -> Result<PathBuf>;
}

/// Templates read from `<template_dir>/<variant>.yml`, run configs written
/// to `<output_dir>/<stem>.yml`
#[derive(Debug, Clone)]
pub struct FsTemplateStore {
    template_dir: PathBuf,
    output_dir: PathBuf,
}

impl FsTemplateStore {
    pub fn new(template_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn template_path(&self, variant: WorkloadVariant) -> PathBuf {
        self.template_dir.join(format!("{}.yml", variant.as_str()))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[async_trait]
impl TemplateStore for FsTemplateStore {
    async fn load_template(&self, variant: WorkloadVariant) -> Result<WorkloadConfig> {
        let path = self.template_path(variant);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ConfigError::TemplateUnreadable {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), "Loaded template");
        WorkloadConfig::from_yaml_str(&content).map_err(|e| match e {
            ConfigError::TemplateMalformed(reason) => {
                ConfigError::TemplateMalformed(format!("{}: {}", path.display(), reason)).into()
            }
            other => other.into(),
        })
    }

    async fn persist(&self, config: &WorkloadConfig, file_stem: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(format!("{}.yml", file_stem));
        let yaml = config.to_yaml_string()?;
        let persist_err = |source| ConfigError::PersistFailed {
            path: path.clone(),
            source,
        };

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(persist_err)?;
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(persist_err)?;
        file.write_all(yaml.as_bytes()).await.map_err(persist_err)?;
        file.flush().await.map_err(persist_err)?;

        debug!(path = %path.display(), "Persisted run config");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BurnerError;
    use crate::testing::POD_DENSITY_TEMPLATE;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_and_persist() {
        let temp_dir = TempDir::new().unwrap();
        let templates = temp_dir.path().join("templates");
        tokio::fs::create_dir_all(&templates).await.unwrap();
        tokio::fs::write(templates.join("pod-density.yml"), POD_DENSITY_TEMPLATE)
            .await
            .unwrap();

        let store = FsTemplateStore::new(&templates, temp_dir.path().join("runs"));
        let config = store.load_template(WorkloadVariant::PodDensity).await.unwrap();

        let path = store.persist(&config, "pod-density-abc").await.unwrap();
        assert_eq!(path, temp_dir.path().join("runs").join("pod-density-abc.yml"));

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(WorkloadConfig::from_yaml_str(&written).unwrap(), config);
    }

    #[tokio::test]
    async fn test_persist_is_write_once() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsTemplateStore::new(temp_dir.path(), temp_dir.path());
        let config = WorkloadConfig::from_yaml_str("global: {}\n").unwrap();

        store.persist(&config, "run-1").await.unwrap();
        let err = store.persist(&config, "run-1").await.unwrap_err();
        assert!(matches!(
            err,
            BurnerError::Config(ConfigError::PersistFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_template_is_unreadable() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsTemplateStore::new(temp_dir.path(), temp_dir.path());
        let err = store
            .load_template(WorkloadVariant::NodeDensity)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BurnerError::Config(ConfigError::TemplateUnreadable { .. })
        ));
    }
}
