//! Request and response types for the external collaborators.

use centric_etl_shared::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One page of a Data Connect table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub data: Vec<Record>,
    #[serde(default)]
    pub pagination: Pagination,
}

/// Pagination block of a Data Connect response.
///
/// Absence of `next_page_url` ends the table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub next_page_url: Option<String>,
}

/// Selection of documents within one staging collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Every document in the collection.
    All,
    /// Documents whose top-level `field` equals `value`.
    FieldEquals { field: String, value: String },
}

impl Filter {
    pub fn all() -> Self {
        Self::All
    }

    pub fn field_eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::FieldEquals {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Evaluate the filter against a document.
    ///
    /// Scalars compare by their text form, matching how the PostgreSQL store
    /// extracts JSONB fields with `->>`.
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Filter::All => true,
            Filter::FieldEquals { field, value } => match document.get(field) {
                Some(Value::String(s)) => s == value,
                Some(v @ Value::Number(_)) | Some(v @ Value::Bool(_)) => v.to_string() == *value,
                _ => false,
            },
        }
    }
}

/// Request sent to the registry to create a new index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIndexRequest {
    pub entity: String,
    #[serde(rename = "type")]
    pub index_type: String,
    pub shard_prefix: String,
    pub shard: String,
    pub release_prefix: String,
    pub clone_from_released_index: bool,
}

impl CreateIndexRequest {
    /// The fixed request for a new sequence-centric index of `entity`.
    pub fn centric(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            index_type: "centric".to_string(),
            shard_prefix: "source".to_string(),
            shard: "dnastack".to_string(),
            release_prefix: "re".to_string(),
            clone_from_released_index: false,
        }
    }
}

/// An index issued by the registry.
///
/// Carries the concrete index name plus the shard and release metadata needed
/// to publish it later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexHandle {
    pub index_name: String,
    pub entity: String,
    #[serde(rename = "type")]
    pub index_type: String,
    pub shard_prefix: String,
    pub shard: String,
    pub release_prefix: String,
    pub release: String,
    #[serde(default)]
    pub valid: bool,
}

/// Request to repoint an alias at the shards of a released index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexReleaseRequest {
    pub alias: String,
    pub release: String,
    pub shards: Vec<String>,
}

impl IndexReleaseRequest {
    /// Build the release request publishing `index` under `alias`.
    pub fn for_index(alias: impl Into<String>, index: &IndexHandle) -> Self {
        Self {
            alias: alias.into(),
            release: format!("{}_{}", index.release_prefix, index.release),
            shards: vec![format!("{}_{}", index.shard_prefix, index.shard)],
        }
    }
}

/// One document of a bulk index request.
///
/// `id` becomes the wire-level `_id`, so re-indexing the same document into the
/// same index overwrites rather than duplicates it.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkDocument {
    pub id: String,
    pub source: Value,
}
