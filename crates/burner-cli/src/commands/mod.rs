//! CLI command implementations

pub mod release;
pub mod run;
