//! The denormalized document produced by the transform stage.
//!
//! Source records are open-ended JSON objects: the Data Connect tables carry
//! dozens of optional columns and only the identifier and foreign-key fields
//! are interpreted by the ETL. Everything else is passed through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A staged source record: one row of a Data Connect table.
pub type Record = Map<String, Value>;

/// Search-ready document for one sequence.
///
/// Contains every field of the sequence record plus embedded copies of its
/// files, sample, host, collections and data source. The document is keyed in
/// the search index by `sequence_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceCentric {
    pub sequence_id: String,
    pub files: Vec<Record>,
    pub sample: Record,
    pub host: Record,
    pub collections: Vec<Record>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<Record>,
    /// Remaining sequence fields, flattened into the top level.
    #[serde(flatten)]
    pub fields: Record,
}

impl SequenceCentric {
    /// Field names owned by the document structure itself.
    pub const RESERVED_FIELDS: [&'static str; 6] = [
        "sequence_id",
        "files",
        "sample",
        "host",
        "collections",
        "data_source",
    ];

    /// Build a document from a sequence record and its resolved relations.
    ///
    /// Returns `None` if the sequence has no string `sequence_id`. Reserved
    /// field names present in the sequence record are dropped from `fields`.
    pub fn new(
        mut sequence: Record,
        files: Vec<Record>,
        sample: Record,
        host: Record,
        collections: Vec<Record>,
        data_source: Option<Record>,
    ) -> Option<Self> {
        let sequence_id = match sequence.get("sequence_id") {
            Some(Value::String(id)) => id.clone(),
            _ => return None,
        };
        for reserved in Self::RESERVED_FIELDS {
            sequence.remove(reserved);
        }

        Some(Self {
            sequence_id,
            files,
            sample,
            host,
            collections,
            data_source,
            fields: sequence,
        })
    }

    /// Serialize into a JSON object for storage or indexing.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
