//! Run and stage summaries.
//!
//! A `RunSummary` is created when a run starts, filled in as stages complete
//! and persisted exactly once when the run ends, whether it succeeded or not.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::entity::EntityKind;
use crate::types::stage::StageSet;

/// Result of the extract stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractSummary {
    /// Records staged per entity kind during this call.
    pub counts: BTreeMap<EntityKind, u64>,
    /// Elapsed milliseconds.
    pub duration: u64,
}

/// Result of the transform stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformSummary {
    /// Documents written, excluding sequences skipped on a join miss.
    pub documents_created: u64,
    /// Elapsed milliseconds.
    pub duration: u64,
}

/// Result of the load stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSummary {
    /// Name of the index that was populated and released.
    pub index: String,
    /// Elapsed milliseconds.
    pub duration: u64,
}

/// Historical record of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub stages: StageSet,
    /// What requested the run (e.g. "schedule", "api", "cli").
    pub trigger: String,
    pub start: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract: Option<ExtractSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<TransformSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load: Option<LoadSummary>,
    pub errors: Vec<String>,
    /// Total elapsed milliseconds, set when the run ends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

impl RunSummary {
    /// Start a summary for a run beginning now.
    pub fn start(stages: StageSet, trigger: impl Into<String>) -> Self {
        Self {
            stages,
            trigger: trigger.into(),
            start: Utc::now(),
            end: None,
            extract: None,
            transform: None,
            load: None,
            errors: Vec::new(),
            duration: None,
        }
    }

    /// Whether the run finished without recording any error.
    pub fn succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}
