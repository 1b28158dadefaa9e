//! Output formatting utilities

use burner_lib::{NodeLease, RunResult, WorkloadVariant};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Log line format
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Tabled)]
struct RunRow {
    #[tabled(rename = "Variant")]
    variant: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Run ID / Exit Code")]
    detail: String,
}

#[derive(Serialize)]
struct RunReport<'a> {
    variant: WorkloadVariant,
    #[serde(flatten)]
    result: &'a RunResult,
}

/// Print a run outcome; engine output or the failure message follows the table
pub fn print_run_result(variant: WorkloadVariant, result: &RunResult, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let report = RunReport { variant, result };
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{}", json),
                Err(e) => print_error(&format!("Failed to serialize result: {}", e)),
            }
        }
        OutputFormat::Table => {
            let (status, detail) = match result {
                RunResult::Success { run_id, .. } => {
                    ("success".green().to_string(), run_id.to_string())
                }
                RunResult::Failure { exit_code, .. } => {
                    ("failure".red().to_string(), exit_code.to_string())
                }
            };
            let row = RunRow {
                variant: variant.to_string(),
                status,
                detail,
            };
            println!("{}", Table::new([row]).with(Style::rounded()).to_string());

            match result {
                RunResult::Success { output, .. } => {
                    if !output.trim().is_empty() {
                        println!("\n{}", output.trim_end());
                    }
                    print_success(&format!("{} finished", variant));
                }
                RunResult::Failure { message, .. } => print_error(message),
            }
        }
    }
}

#[derive(Tabled)]
struct ReleaseRow {
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Label Key")]
    key: String,
}

/// Print the nodes a release touched
pub fn print_release(lease: &NodeLease, format: OutputFormat) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(lease) {
            Ok(json) => println!("{}", json),
            Err(e) => print_error(&format!("Failed to serialize lease: {}", e)),
        },
        OutputFormat::Table => {
            if lease.leased_nodes.is_empty() {
                print_warning("No nodes given");
                return;
            }
            let rows: Vec<ReleaseRow> = lease
                .leased_nodes
                .iter()
                .map(|node| ReleaseRow {
                    node: node.to_string(),
                    key: lease.label.key.clone(),
                })
                .collect();
            println!("{}", Table::new(rows).with(Style::rounded()).to_string());
            print_success(&format!(
                "Removed '{}' from {} node(s)",
                lease.label.key,
                lease.leased_nodes.len()
            ));
        }
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue().bold(), message);
}
