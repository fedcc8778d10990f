//! Staging store collections.

use std::fmt;

use crate::types::entity::EntityKind;

/// A named document collection in the staging store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StagingCollection {
    /// Raw records of one source entity kind, replaced by every extraction.
    Source(EntityKind),
    /// Denormalized documents, rebuilt by every transform.
    SequenceCentric,
    /// Append-only run summaries.
    Runs,
}

impl StagingCollection {
    /// The collection name as stored.
    pub fn name(&self) -> &'static str {
        match self {
            StagingCollection::Source(kind) => kind.collection_name(),
            StagingCollection::SequenceCentric => "sequencecentric",
            StagingCollection::Runs => "runs",
        }
    }
}

impl From<EntityKind> for StagingCollection {
    fn from(kind: EntityKind) -> Self {
        StagingCollection::Source(kind)
    }
}

impl fmt::Display for StagingCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
