//! Per-variant override tables
//!
//! Each variant declares which logical fields it accepts and which object
//! list entries receive the node selector. Adding a variant means adding a
//! row to [`PROFILES`].

use super::document::{FieldPath, Segment};
use crate::models::WorkloadVariant;
use serde::{Deserialize, Serialize};
use Segment::{Index, Key};

/// Logical fields a run may override
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    IndexerServers,
    DefaultIndex,
    IndexingEnabled,
    WriteToFile,
    MeasurementThreshold,
    JobIterations,
    Qps,
    Burst,
    Namespace,
    NamespacedIterations,
    PodWait,
    Cleanup,
    WaitFor,
    WaitWhenFinished,
    VerifyObjects,
    ErrorOnVerify,
    MaxWaitTimeout,
    PreloadImages,
    PreloadPeriod,
}

impl Field {
    pub fn path(&self) -> FieldPath {
        let job = |key: &'static str| FieldPath::new(&[Key("jobs"), Index(0), Key(key)]);
        match self {
            Field::IndexerServers => FieldPath::new(&[Key("global"), Key("indexerConfig"), Key("esServers")]),
            Field::DefaultIndex => FieldPath::new(&[Key("global"), Key("indexerConfig"), Key("defaultIndex")]),
            Field::IndexingEnabled => FieldPath::new(&[Key("global"), Key("indexerConfig"), Key("enabled")]),
            Field::WriteToFile => FieldPath::new(&[Key("global"), Key("writeToFile")]),
            Field::MeasurementThreshold => FieldPath::new(&[
                Key("global"),
                Key("measurements"),
                Index(0),
                Key("thresholds"),
                Index(0),
                Key("threshold"),
            ]),
            Field::JobIterations => job("jobIterations"),
            Field::Qps => job("qps"),
            Field::Burst => job("burst"),
            Field::Namespace => job("namespace"),
            Field::NamespacedIterations => job("namespacedIterations"),
            Field::PodWait => job("podWait"),
            Field::Cleanup => job("cleanup"),
            Field::WaitFor => job("waitFor"),
            Field::WaitWhenFinished => job("waitWhenFinished"),
            Field::VerifyObjects => job("verifyObjects"),
            Field::ErrorOnVerify => job("errorOnVerify"),
            Field::MaxWaitTimeout => job("maxWaitTimeout"),
            Field::PreloadImages => job("preLoadImages"),
            Field::PreloadPeriod => job("preLoadPeriod"),
        }
    }
}

/// Path of the node selector input of object `index` in the first job
pub fn node_selector_path(index: usize) -> FieldPath {
    FieldPath::new(&[
        Key("jobs"),
        Index(0),
        Key("objects"),
        Index(index),
        Key("inputVars"),
        Key("nodeSelector"),
    ])
}

/// Override rules for one variant
#[derive(Debug)]
pub struct VariantProfile {
    pub variant: WorkloadVariant,
    pub fields: &'static [Field],
    pub node_selector_objects: &'static [usize],
}

impl VariantProfile {
    pub fn accepts(&self, field: Field) -> bool {
        self.fields.contains(&field)
    }
}

const INDEXER_FIELDS: &[Field] = &[
    Field::IndexerServers,
    Field::DefaultIndex,
    Field::IndexingEnabled,
    Field::WriteToFile,
];

const JOB_FIELDS: &[Field] = &[
    Field::IndexerServers,
    Field::DefaultIndex,
    Field::IndexingEnabled,
    Field::WriteToFile,
    Field::JobIterations,
    Field::Qps,
    Field::Burst,
    Field::Namespace,
    Field::NamespacedIterations,
    Field::PodWait,
    Field::Cleanup,
    Field::WaitFor,
    Field::WaitWhenFinished,
    Field::VerifyObjects,
    Field::ErrorOnVerify,
    Field::MaxWaitTimeout,
    Field::PreloadImages,
    Field::PreloadPeriod,
];

const THRESHOLD_JOB_FIELDS: &[Field] = &[
    Field::IndexerServers,
    Field::DefaultIndex,
    Field::IndexingEnabled,
    Field::WriteToFile,
    Field::MeasurementThreshold,
    Field::JobIterations,
    Field::Qps,
    Field::Burst,
    Field::Namespace,
    Field::NamespacedIterations,
    Field::PodWait,
    Field::Cleanup,
    Field::WaitFor,
    Field::WaitWhenFinished,
    Field::VerifyObjects,
    Field::ErrorOnVerify,
    Field::MaxWaitTimeout,
    Field::PreloadImages,
    Field::PreloadPeriod,
];

pub static PROFILES: [VariantProfile; 6] = [
    VariantProfile {
        variant: WorkloadVariant::Indexer,
        fields: INDEXER_FIELDS,
        node_selector_objects: &[],
    },
    VariantProfile {
        variant: WorkloadVariant::PodDensity,
        fields: THRESHOLD_JOB_FIELDS,
        node_selector_objects: &[0],
    },
    VariantProfile {
        variant: WorkloadVariant::ClusterDensity,
        fields: JOB_FIELDS,
        node_selector_objects: &[2, 3],
    },
    VariantProfile {
        variant: WorkloadVariant::NodeDensity,
        fields: THRESHOLD_JOB_FIELDS,
        node_selector_objects: &[0],
    },
    VariantProfile {
        variant: WorkloadVariant::NodeDensityHeavy,
        fields: THRESHOLD_JOB_FIELDS,
        node_selector_objects: &[0, 1],
    },
    VariantProfile {
        variant: WorkloadVariant::NodeDensityCni,
        fields: THRESHOLD_JOB_FIELDS,
        node_selector_objects: &[1, 2],
    },
];

pub fn profile(variant: WorkloadVariant) -> &'static VariantProfile {
    PROFILES
        .iter()
        .find(|p| p.variant == variant)
        .unwrap_or_else(|| unreachable!("every variant has a profile row"))
}
