//! Pipeline stages and the stage sets a run may request.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// One stage of the pipeline.
///
/// The derived ordering is the execution order: a run always executes its
/// stages as EXTRACT, then TRANSFORM, then LOAD regardless of request order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Stage {
    Extract,
    Transform,
    Load,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extract => "EXTRACT",
            Stage::Transform => "TRANSFORM",
            Stage::Load => "LOAD",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rejection of a requested stage set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidStageSet {
    /// EXTRACT and LOAD without TRANSFORM would load documents derived from a
    /// previous extraction.
    #[error(
        "EXTRACT and LOAD requested without TRANSFORM stage. Stopping this run to protect against \
         accidentally loading different data than was extracted. You likely meant to run all stages."
    )]
    ExtractAndLoadWithoutTransform,
}

/// The set of stages requested for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageSet(BTreeSet<Stage>);

impl StageSet {
    /// All three stages.
    pub fn all() -> Self {
        Self::from_iter([Stage::Extract, Stage::Transform, Stage::Load])
    }

    /// A set holding exactly one stage.
    pub fn only(stage: Stage) -> Self {
        Self::from_iter([stage])
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.0.contains(&stage)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate the requested stages in execution order.
    pub fn iter(&self) -> impl Iterator<Item = Stage> + '_ {
        self.0.iter().copied()
    }

    /// Check the ordering invariant between stages.
    ///
    /// Must be called before any stage executes.
    pub fn validate(&self) -> Result<(), InvalidStageSet> {
        if self.contains(Stage::Extract)
            && self.contains(Stage::Load)
            && !self.contains(Stage::Transform)
        {
            return Err(InvalidStageSet::ExtractAndLoadWithoutTransform);
        }
        Ok(())
    }
}

impl FromIterator<Stage> for StageSet {
    fn from_iter<I: IntoIterator<Item = Stage>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for StageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|s| s.as_str()).collect();
        write!(f, "{}", names.join(", "))
    }
}
