//! In-memory collaborators for unit tests

use crate::cluster::{ClusterControlPlane, RoleFilter, NODE_ROLE_PREFIX};
use crate::credentials::CredentialProvider;
use crate::error::{BurnerError, ConfigError, CredentialError, Result};
use crate::models::{Credentials, NodeSet, WorkloadVariant};
use crate::runner::{BenchmarkEngine, EngineInvocation, EngineOutput};
use crate::workload::{TemplateStore, WorkloadConfig};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaneCall {
    List,
    Label { nodes: NodeSet, key: String, value: String },
    Unlabel { nodes: NodeSet, key: String },
    RunningPods,
}

#[derive(Default)]
struct PlaneState {
    /// Node name -> labels, in insertion order
    nodes: Vec<(String, BTreeMap<String, String>)>,
    running: HashMap<String, u64>,
    fail_label: HashSet<String>,
    fail_unlabel: bool,
    fail_unlabel_nodes: HashSet<String>,
    calls: Vec<PlaneCall>,
}

/// Control plane backed by a node table
#[derive(Default)]
pub struct FakeControlPlane {
    state: Mutex<PlaneState>,
}

impl FakeControlPlane {
    pub fn with_workers(names: &[&str]) -> Self {
        let plane = Self::default();
        for name in names {
            plane.add_node(name, &["worker"]);
        }
        plane
    }

    pub fn add_node(&self, name: &str, roles: &[&str]) {
        let labels = roles
            .iter()
            .map(|role| (format!("{}{}", NODE_ROLE_PREFIX, role), String::new()))
            .collect();
        self.state.lock().unwrap().nodes.push((name.to_string(), labels));
    }

    pub fn set_running(&self, node: &str, count: u64) {
        self.state
            .lock()
            .unwrap()
            .running
            .insert(node.to_string(), count);
    }

    pub fn set_label(&self, node: &str, key: &str, value: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some((_, labels)) = state.nodes.iter_mut().find(|(n, _)| n == node) {
            labels.insert(key.to_string(), value.to_string());
        }
    }

    pub fn has_label(&self, node: &str, key: &str) -> bool {
        let state = self.state.lock().unwrap();
        state
            .nodes
            .iter()
            .find(|(n, _)| n == node)
            .map(|(_, labels)| labels.contains_key(key))
            .unwrap_or(false)
    }

    pub fn fail_label_on(&self, node: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_label
            .insert(node.to_string());
    }

    pub fn fail_unlabel(&self) {
        self.state.lock().unwrap().fail_unlabel = true;
    }

    /// Unlabelling `node` fails; the other nodes in the call are still cleared
    pub fn fail_unlabel_on(&self, node: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_unlabel_nodes
            .insert(node.to_string());
    }

    pub fn calls(&self) -> Vec<PlaneCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn unlabel_calls(&self) -> Vec<NodeSet> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PlaneCall::Unlabel { nodes, .. } => Some(nodes),
                _ => None,
            })
            .collect()
    }

    pub fn label_calls(&self) -> Vec<NodeSet> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PlaneCall::Label { nodes, .. } => Some(nodes),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ClusterControlPlane for FakeControlPlane {
    async fn list_nodes(&self, filter: &RoleFilter) -> Result<Vec<String>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(PlaneCall::List);
        Ok(state
            .nodes
            .iter()
            .filter(|(_, labels)| filter.matches(labels))
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn label_nodes(&self, nodes: &NodeSet, key: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(PlaneCall::Label {
            nodes: nodes.clone(),
            key: key.to_string(),
            value: value.to_string(),
        });
        for name in nodes.iter() {
            if state.fail_label.contains(name) {
                return Err(BurnerError::ExternalProcess {
                    command: "label".to_string(),
                    exit_code: 1,
                    output: format!("node {} rejected label", name),
                });
            }
            if let Some((_, labels)) = state.nodes.iter_mut().find(|(n, _)| n == name) {
                labels.insert(key.to_string(), value.to_string());
            }
        }
        Ok(())
    }

    async fn unlabel_nodes(&self, nodes: &NodeSet, key: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(PlaneCall::Unlabel {
            nodes: nodes.clone(),
            key: key.to_string(),
        });
        if state.fail_unlabel {
            return Err(BurnerError::Cluster("unlabel rejected".to_string()));
        }
        let mut failed = Vec::new();
        for name in nodes.iter() {
            if state.fail_unlabel_nodes.contains(name) {
                failed.push(name.to_string());
                continue;
            }
            if let Some((_, labels)) = state.nodes.iter_mut().find(|(n, _)| n == name) {
                labels.remove(key);
            }
        }
        if !failed.is_empty() {
            return Err(BurnerError::Cluster(format!(
                "failed to remove label on {}",
                failed.join(", ")
            )));
        }
        Ok(())
    }

    async fn running_pods_by_node(&self) -> Result<HashMap<String, u64>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(PlaneCall::RunningPods);
        Ok(state.running.clone())
    }
}

/// Credential provider returning a fixed pair, or failing
pub struct FakeCredentials {
    pub fail: bool,
}

#[async_trait]
impl CredentialProvider for FakeCredentials {
    async fn monitoring_endpoint(&self) -> Result<Credentials> {
        if self.fail {
            return Err(CredentialError::Token {
                namespace: "openshift-monitoring".to_string(),
                name: "prometheus-k8s".to_string(),
                reason: "forbidden".to_string(),
            }
            .into());
        }
        Ok(Credentials {
            endpoint: "https://prometheus.test".to_string(),
            token: "token-abc".to_string(),
        })
    }
}

/// Engine that records invocations and replies with a canned output
pub struct FakeEngine {
    pub exit_code: i32,
    pub output: String,
    pub panic: bool,
    invocations: Mutex<Vec<EngineInvocation>>,
}

impl FakeEngine {
    pub fn succeeding(output: &str) -> Self {
        Self {
            exit_code: 0,
            output: output.to_string(),
            panic: false,
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(exit_code: i32, output: &str) -> Self {
        Self {
            exit_code,
            ..Self::succeeding(output)
        }
    }

    pub fn panicking() -> Self {
        Self {
            panic: true,
            ..Self::succeeding("")
        }
    }

    pub fn invocations(&self) -> Vec<EngineInvocation> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl BenchmarkEngine for FakeEngine {
    async fn execute(&self, invocation: &EngineInvocation) -> Result<EngineOutput> {
        self.invocations.lock().unwrap().push(invocation.clone());
        if self.panic {
            panic!("benchmark engine crashed");
        }
        Ok(EngineOutput {
            exit_code: self.exit_code,
            output: self.output.clone(),
        })
    }
}

/// Template store holding templates and persisted configs in memory
#[derive(Default)]
pub struct MemoryTemplateStore {
    templates: Mutex<HashMap<WorkloadVariant, WorkloadConfig>>,
    persisted: Mutex<Vec<(PathBuf, WorkloadConfig)>>,
}

impl MemoryTemplateStore {
    pub fn with_template(self, variant: WorkloadVariant, yaml: &str) -> Self {
        let config = WorkloadConfig::from_yaml_str(yaml).unwrap();
        self.templates.lock().unwrap().insert(variant, config);
        self
    }

    pub fn persisted(&self) -> Vec<(PathBuf, WorkloadConfig)> {
        self.persisted.lock().unwrap().clone()
    }
}

#[async_trait]
impl TemplateStore for MemoryTemplateStore {
    async fn load_template(&self, variant: WorkloadVariant) -> Result<WorkloadConfig> {
        self.templates
            .lock()
            .unwrap()
            .get(&variant)
            .cloned()
            .ok_or_else(|| {
                ConfigError::TemplateMalformed(format!("no template for {}", variant)).into()
            })
    }

    async fn persist(&self, config: &WorkloadConfig, file_stem: &str) -> Result<PathBuf> {
        let path = PathBuf::from(format!("/memory/{}.yml", file_stem));
        self.persisted
            .lock()
            .unwrap()
            .push((path.clone(), config.clone()));
        Ok(path)
    }
}

pub const POD_DENSITY_TEMPLATE: &str = r#"
global:
  writeToFile: false
  indexerConfig:
    enabled: true
    esServers: ["https://es.example:443"]
    insecureSkipVerify: true
    defaultIndex: ripsaw-kube-burner
    type: elastic
  measurements:
    - name: podLatency
      thresholds:
        - conditionType: Ready
          metric: P99
          threshold: 3000ms
jobs:
  - name: pod-density
    jobIterations: 1
    qps: 1
    burst: 1
    namespace: placeholder
    namespacedIterations: false
    podWait: true
    cleanup: false
    waitFor: []
    waitWhenFinished: false
    verifyObjects: false
    errorOnVerify: false
    maxWaitTimeout: 5m
    preLoadImages: false
    preLoadPeriod: 30s
    objects:
      - objectTemplate: templates/pod.yml
        replicas: 1
        inputVars:
          containerImage: gcr.io/google_containers/pause:3.1
          nodeSelector: "{}"
"#;

pub const NODE_DENSITY_HEAVY_TEMPLATE: &str = r#"
global:
  writeToFile: false
  indexerConfig:
    enabled: true
    esServers: ["https://es.example:443"]
    defaultIndex: ripsaw-kube-burner
    type: elastic
  measurements:
    - name: podLatency
      thresholds:
        - conditionType: Ready
          metric: P99
          threshold: 3000ms
jobs:
  - name: node-density-heavy
    jobIterations: 1
    qps: 1
    burst: 1
    namespace: placeholder
    podWait: false
    cleanup: true
    waitFor: []
    waitWhenFinished: true
    verifyObjects: true
    errorOnVerify: true
    maxWaitTimeout: 1h
    preLoadImages: true
    preLoadPeriod: 2m
    objects:
      - objectTemplate: templates/postgres-deployment.yml
        replicas: 1
        inputVars:
          nodeSelector: "{}"
      - objectTemplate: templates/app-deployment.yml
        replicas: 1
        inputVars:
          readinessPeriod: 10
          nodeSelector: "{}"
      - objectTemplate: templates/postgres-service.yml
        replicas: 1
"#;

pub const INDEXER_TEMPLATE: &str = r#"
global:
  writeToFile: true
  indexerConfig:
    enabled: true
    esServers: ["https://es.example:443"]
    defaultIndex: placeholder
    type: elastic
"#;

pub const CLUSTER_DENSITY_TEMPLATE: &str = r#"
global:
  writeToFile: false
  indexerConfig:
    enabled: true
    esServers: ["https://es.example:443"]
    defaultIndex: ripsaw-kube-burner
    type: elastic
  measurements:
    - name: podLatency
jobs:
  - name: cluster-density
    jobIterations: 1
    qps: 1
    burst: 1
    namespace: placeholder
    namespacedIterations: true
    podWait: false
    cleanup: true
    waitFor: []
    objects:
      - objectTemplate: templates/imagestream.yml
        replicas: 1
      - objectTemplate: templates/build.yml
        replicas: 1
      - objectTemplate: templates/deployment.yml
        replicas: 5
        inputVars:
          nodeSelector: "{}"
      - objectTemplate: templates/deployment.yml
        replicas: 5
        inputVars:
          nodeSelector: "{}"
      - objectTemplate: templates/service.yml
        replicas: 5
"#;

pub const NODE_DENSITY_CNI_TEMPLATE: &str = r#"
global:
  writeToFile: false
  indexerConfig:
    enabled: true
    esServers: ["https://es.example:443"]
    defaultIndex: ripsaw-kube-burner
    type: elastic
  measurements:
    - name: podLatency
      thresholds:
        - conditionType: Ready
          metric: P99
          threshold: 3000ms
jobs:
  - name: node-density-cni
    jobIterations: 1
    qps: 1
    burst: 1
    namespace: placeholder
    podWait: false
    cleanup: true
    waitFor: []
    objects:
      - objectTemplate: templates/webserver-service.yml
        replicas: 1
      - objectTemplate: templates/webserver-deployment.yml
        replicas: 1
        inputVars:
          nodeSelector: "{}"
      - objectTemplate: templates/curl-deployment.yml
        replicas: 1
        inputVars:
          nodeSelector: "{}"
"#;
