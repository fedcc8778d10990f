//! Source entity kinds.
//!
//! Every table extracted from the Data Connect API maps to exactly one
//! `EntityKind`, which in turn owns one staging collection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One source table of the normalized dataset.
///
/// The ordering of the variants is the ordering used for summaries and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    #[serde(rename = "collections")]
    Collection,
    #[serde(rename = "datasources")]
    DataSource,
    #[serde(rename = "files")]
    File,
    #[serde(rename = "hosts")]
    Host,
    #[serde(rename = "samples")]
    Sample,
    #[serde(rename = "sequences")]
    Sequence,
}

impl EntityKind {
    /// All entity kinds, in summary order.
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Collection,
        EntityKind::DataSource,
        EntityKind::File,
        EntityKind::Host,
        EntityKind::Sample,
        EntityKind::Sequence,
    ];

    /// Name of the staging collection holding records of this kind.
    pub fn collection_name(&self) -> &'static str {
        match self {
            EntityKind::Collection => "collections",
            EntityKind::DataSource => "datasources",
            EntityKind::File => "files",
            EntityKind::Host => "hosts",
            EntityKind::Sample => "samples",
            EntityKind::Sequence => "sequences",
        }
    }

    /// Table name in the Data Connect API (without namespace or `_table` suffix).
    pub fn table_name(&self) -> &'static str {
        match self {
            EntityKind::Collection => "collection",
            EntityKind::DataSource => "data_source",
            EntityKind::File => "sequence_file",
            EntityKind::Host => "host",
            EntityKind::Sample => "sample",
            EntityKind::Sequence => "sequence",
        }
    }

    /// The field carrying the identifier that is unique within this kind.
    pub fn id_field(&self) -> &'static str {
        match self {
            EntityKind::Collection => "collection_id",
            EntityKind::DataSource => "data_source_id",
            EntityKind::File => "file_id",
            EntityKind::Host => "host_id",
            EntityKind::Sample => "sample_id",
            EntityKind::Sequence => "sequence_id",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.collection_name())
    }
}
