//! Shipped templates against the per-variant override tables

use burner_lib::workload::{build, node_selector_path, profile, Field, FsTemplateStore, NodeSelector, RunOverrides, TemplateStore};
use burner_lib::{LeaseLabel, WorkloadVariant};
use serde_yaml::Value;
use std::path::PathBuf;

fn shipped_templates() -> FsTemplateStore {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../templates");
    FsTemplateStore::new(&root, std::env::temp_dir())
}

fn run_overrides() -> RunOverrides {
    RunOverrides::new()
        .list(Field::IndexerServers, &["https://es.example:443".to_string()])
        .text(Field::DefaultIndex, "ripsaw-kube-burner")
        .flag(Field::IndexingEnabled, true)
        .flag(Field::WriteToFile, false)
        .text(Field::MeasurementThreshold, "7000ms")
        .count(Field::JobIterations, 42)
        .count(Field::Qps, 20)
        .count(Field::Burst, 20)
        .text(Field::Namespace, "bench-run")
        .list(Field::WaitFor, &[])
        .node_selector(NodeSelector::from_label(&LeaseLabel::default()))
}

#[tokio::test]
async fn test_every_shipped_template_builds() {
    let store = shipped_templates();

    for variant in WorkloadVariant::ALL {
        let template = store
            .load_template(variant)
            .await
            .unwrap_or_else(|e| panic!("{} template: {}", variant, e));
        let config = build(&template, variant, &run_overrides())
            .unwrap_or_else(|e| panic!("{} build: {}", variant, e));

        let servers = config.get(&Field::IndexerServers.path()).cloned();
        assert_eq!(
            servers,
            Some(Value::Sequence(vec![Value::String("https://es.example:443".to_string())])),
            "{} indexer servers",
            variant
        );

        for index in profile(variant).node_selector_objects {
            assert_eq!(
                config.get(&node_selector_path(*index)).and_then(Value::as_str),
                Some(r#"{"node-density": "enabled"}"#),
                "{} object {} selector",
                variant,
                index
            );
        }

        if variant != WorkloadVariant::Indexer {
            assert_eq!(
                config.get(&Field::JobIterations.path()).and_then(Value::as_u64),
                Some(42),
                "{} iterations",
                variant
            );
        }
    }
}

#[tokio::test]
async fn test_cluster_density_keeps_its_own_threshold() {
    let store = shipped_templates();
    let template = store
        .load_template(WorkloadVariant::ClusterDensity)
        .await
        .unwrap();
    let config = build(&template, WorkloadVariant::ClusterDensity, &run_overrides()).unwrap();

    assert_eq!(config.get(&Field::MeasurementThreshold.path()), None);
}
