//! Run configuration assembly
//!
//! Applies a run's computed parameters to a copy of the variant template.

use super::document::WorkloadConfig;
use super::table::{node_selector_path, profile, Field};
use crate::error::ConfigError;
use crate::models::{LeaseLabel, WorkloadVariant};
use serde_yaml::{Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Node selector handed to the engine's object templates
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeSelector(BTreeMap<String, String>);

impl NodeSelector {
    pub fn from_label(label: &LeaseLabel) -> Self {
        let mut map = BTreeMap::new();
        map.insert(label.key.clone(), label.value.clone());
        Self(map)
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}

impl FromStr for NodeSelector {
    type Err = ConfigError;

    /// Parse a YAML flow mapping such as `{node-role.kubernetes.io/worker: }`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed: Value = serde_yaml::from_str(s)
            .map_err(|e| ConfigError::InvalidOverride(format!("node selector '{}': {}", s, e)))?;
        let mapping = match parsed {
            Value::Mapping(m) => m,
            Value::Null => return Ok(Self::default()),
            _ => {
                return Err(ConfigError::InvalidOverride(format!(
                    "node selector '{}' is not a mapping",
                    s
                )))
            }
        };

        let mut map = BTreeMap::new();
        for (key, value) in mapping {
            let key = scalar_to_string(&key).ok_or_else(|| {
                ConfigError::InvalidOverride(format!("node selector '{}' has a non-scalar key", s))
            })?;
            let value = scalar_to_string(&value).ok_or_else(|| {
                ConfigError::InvalidOverride(format!("node selector '{}' has a non-scalar value", s))
            })?;
            map.insert(key, value);
        }
        Ok(Self(map))
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl fmt::Display for NodeSelector {
    /// Flow mapping form, as object templates interpolate it inline
    ///
    /// Keys and values are double-quoted so label values such as `true` or
    /// `123` stay strings once the manifest is parsed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<String> = self
            .0
            .iter()
            .map(|(k, v)| format!("{}: {}", quoted(k), quoted(v)))
            .collect();
        write!(f, "{{{}}}", entries.join(", "))
    }
}

/// JSON string literal, which YAML reads as a double-quoted scalar
fn quoted(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

/// Values computed for one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOverrides {
    values: BTreeMap<Field, Value>,
    node_selector: Option<NodeSelector>,
}

impl RunOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: Field, value: Value) -> Self {
        self.values.insert(field, value);
        self
    }

    pub fn flag(self, field: Field, value: bool) -> Self {
        self.set(field, Value::Bool(value))
    }

    pub fn count(self, field: Field, value: u64) -> Self {
        self.set(field, Value::Number(Number::from(value)))
    }

    pub fn text(self, field: Field, value: impl Into<String>) -> Self {
        self.set(field, Value::String(value.into()))
    }

    pub fn list(self, field: Field, values: &[String]) -> Self {
        let seq = values.iter().cloned().map(Value::String).collect();
        self.set(field, Value::Sequence(seq))
    }

    pub fn node_selector(mut self, selector: NodeSelector) -> Self {
        self.node_selector = Some(selector);
        self
    }

    pub fn get(&self, field: Field) -> Option<&Value> {
        self.values.get(&field)
    }
}

/// Build the config for one run of `variant` from `template`
///
/// `template` is never modified. Overrides for fields the variant's table
/// does not list are skipped.
pub fn build(
    template: &WorkloadConfig,
    variant: WorkloadVariant,
    overrides: &RunOverrides,
) -> Result<WorkloadConfig, ConfigError> {
    let profile = profile(variant);
    let mut config = template.clone();

    for (field, value) in &overrides.values {
        if !profile.accepts(*field) {
            debug!(variant = %variant, field = ?field, "Variant ignores override");
            continue;
        }
        config.set(&field.path(), value.clone())?;
    }

    if let Some(selector) = &overrides.node_selector {
        let rendered = Value::String(selector.to_string());
        for index in profile.node_selector_objects {
            config.set(&node_selector_path(*index), rendered.clone())?;
        }
    }

    Ok(config)
}
