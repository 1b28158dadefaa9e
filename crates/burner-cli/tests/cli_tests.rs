//! CLI integration tests

use std::process::{Command, Output};

fn burnerctl(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_burnerctl"))
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = burnerctl(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("density benchmarks"),
        "Should show app description"
    );
    for command in [
        "indexer",
        "pod-density",
        "cluster-density",
        "node-density",
        "node-density-heavy",
        "node-density-cni",
        "release",
    ] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = burnerctl(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("burnerctl"), "Should show binary name");
}

#[test]
fn test_node_density_help() {
    let output = burnerctl(&["node-density-heavy", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--node-count"), "Should show node count option");
    assert!(stdout.contains("--pods-per-node"), "Should show pods per node option");
    assert!(stdout.contains("--qps"), "Should show common options");
}

#[test]
fn test_pod_density_help() {
    let output = burnerctl(&["pod-density", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--job-iterations"));
    assert!(stdout.contains("--pod-node-selector"));
}

#[test]
fn test_node_density_requires_node_count() {
    let output = burnerctl(&["node-density"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("--node-count"), "Should name the missing option");
}

#[test]
fn test_indexer_requires_collection_time() {
    let output = burnerctl(&["indexer"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("--collection-time"));
}

#[test]
fn test_release_requires_nodes() {
    let output = burnerctl(&["release"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("--nodes"));
}

#[test]
fn test_invalid_output_format() {
    let output = burnerctl(&["--format", "xml", "release", "--nodes", "n1"]);
    assert!(!output.status.success(), "Unknown format should be rejected");
}

#[test]
fn test_missing_settings_file_fails_before_cluster_access() {
    let output = burnerctl(&[
        "--config",
        "/nonexistent/burnerctl.yaml",
        "release",
        "--nodes",
        "n1",
    ]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("settings"), "Should report the settings failure");
}
