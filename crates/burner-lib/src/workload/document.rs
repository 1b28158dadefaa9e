//! Run configuration documents and structural paths into them

use crate::error::ConfigError;
use serde_yaml::{Mapping, Value};
use std::fmt;

/// One step of a structural path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Key(&'static str),
    Index(usize),
}

/// Location of a value inside a run configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath(Vec<Segment>);

impl FieldPath {
    pub fn new(segments: &[Segment]) -> Self {
        Self(segments.to_vec())
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => write!(f, "{}", key)?,
                Segment::Key(key) => write!(f, ".{}", key)?,
                Segment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

/// A benchmark engine configuration
///
/// Owns its whole tree: cloning yields a fully independent document, so a
/// config built for one run never shares state with another run or with the
/// template it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadConfig {
    root: Value,
}

impl WorkloadConfig {
    pub fn from_value(root: Value) -> Result<Self, ConfigError> {
        if !root.is_mapping() {
            return Err(ConfigError::TemplateMalformed(
                "top level of a run config must be a mapping".to_string(),
            ));
        }
        Ok(Self { root })
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let root: Value = serde_yaml::from_str(yaml)
            .map_err(|e| ConfigError::TemplateMalformed(e.to_string()))?;
        Self::from_value(root)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(&self.root).map_err(|e| ConfigError::TemplateMalformed(e.to_string()))
    }

    /// Value at `path`, if every step exists
    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        path.segments()
            .iter()
            .try_fold(&self.root, |node, segment| match segment {
                Segment::Key(key) => node.as_mapping()?.get(*key),
                Segment::Index(index) => node.as_sequence()?.get(*index),
            })
    }

    /// Overwrite the value at `path`
    ///
    /// Missing mapping keys along the way are created; a missing list
    /// element is an error since the template defines list shapes.
    pub fn set(&mut self, path: &FieldPath, value: Value) -> Result<(), ConfigError> {
        let (last, parents) = path
            .segments()
            .split_last()
            .ok_or_else(|| ConfigError::MissingPath("<empty path>".to_string()))?;

        let mut node = &mut self.root;
        for segment in parents {
            node = step_mut(node, segment, path)?;
        }

        match last {
            Segment::Key(key) => {
                as_mapping_mut(node, path)?.insert(Value::String((*key).to_string()), value);
            }
            Segment::Index(index) => {
                let slot = node
                    .as_sequence_mut()
                    .and_then(|seq| seq.get_mut(*index))
                    .ok_or_else(|| ConfigError::MissingPath(path.to_string()))?;
                *slot = value;
            }
        }
        Ok(())
    }
}

fn as_mapping_mut<'a>(node: &'a mut Value, path: &FieldPath) -> Result<&'a mut Mapping, ConfigError> {
    if node.is_null() {
        *node = Value::Mapping(Mapping::new());
    }
    node.as_mapping_mut().ok_or_else(|| {
        ConfigError::TemplateMalformed(format!("expected a mapping on the way to {}", path))
    })
}

fn step_mut<'a>(node: &'a mut Value, segment: &Segment, path: &FieldPath) -> Result<&'a mut Value, ConfigError> {
    match segment {
        Segment::Key(key) => {
            let map = as_mapping_mut(node, path)?;
            Ok(map
                .entry(Value::String((*key).to_string()))
                .or_insert(Value::Mapping(Mapping::new())))
        }
        Segment::Index(index) => node
            .as_sequence_mut()
            .and_then(|seq| seq.get_mut(*index))
            .ok_or_else(|| ConfigError::MissingPath(path.to_string())),
    }
}
