//! Run configuration handling
//!
//! A base template per variant is loaded once per run, the run's computed
//! values are injected at the structural positions the variant's table
//! names, and the result is persisted to a run-specific file.

mod builder;
mod document;
mod store;
mod table;

pub use builder::{build, NodeSelector, RunOverrides};
pub use document::{FieldPath, Segment, WorkloadConfig};
pub use store::{FsTemplateStore, TemplateStore};
pub use table::{node_selector_path, profile, Field, VariantProfile, PROFILES};
