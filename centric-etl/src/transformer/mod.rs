//! Transform stage.
//!
//! Joins every staged sequence with its files, sample, host, collections and
//! data source into one `SequenceCentric` document.

mod document;

pub use document::{build_document, id_key, to_integer};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use centric_etl_repository::types::Filter;
use centric_etl_repository::StagingStore;
use centric_etl_shared::{EntityKind, Record, StagingCollection, TransformSummary};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::errors::EtlError;
use crate::timer::Timer;

/// Number of sequences joined at the same time.
pub const DEFAULT_TRANSFORM_CONCURRENCY: usize = 10;

/// Sequences between two progress log lines.
const PROGRESS_INTERVAL: u64 = 10_000;

/// Collections and data sources of the current extraction.
///
/// Small dimension tables, loaded once per transform and read-only after.
struct ReferenceSets {
    collections: Vec<Record>,
    data_sources: HashMap<String, Record>,
}

impl ReferenceSets {
    /// Staged collections listed in the host's `collection_ids`, in staging order.
    fn collections_for(&self, host: &Record) -> Vec<Record> {
        let wanted: HashSet<String> = match host.get("collection_ids") {
            Some(Value::Array(ids)) => ids.iter().filter_map(id_key).collect(),
            Some(other) => id_key(other).into_iter().collect(),
            None => HashSet::new(),
        };
        if wanted.is_empty() {
            return Vec::new();
        }
        self.collections
            .iter()
            .filter(|collection| {
                collection
                    .get("collection_id")
                    .and_then(id_key)
                    .is_some_and(|id| wanted.contains(&id))
            })
            .cloned()
            .collect()
    }

    /// The data source the host references, if it was staged.
    fn data_source_for(&self, host: &Record) -> Option<Record> {
        host.get(EntityKind::DataSource.id_field())
            .and_then(id_key)
            .and_then(|id| self.data_sources.get(&id))
            .cloned()
    }
}

/// Builds the derived document collection from the staged source collections.
pub struct Transformer {
    store: Arc<dyn StagingStore>,
    concurrency: usize,
}

impl Transformer {
    pub fn new(store: Arc<dyn StagingStore>) -> Self {
        Self::with_concurrency(store, DEFAULT_TRANSFORM_CONCURRENCY)
    }

    pub fn with_concurrency(store: Arc<dyn StagingStore>, concurrency: usize) -> Self {
        Self {
            store,
            concurrency: concurrency.max(1),
        }
    }

    /// Run the transform stage.
    ///
    /// Sequences whose sample or host is missing are skipped without error
    /// and are not counted. Any staging store failure aborts the stage.
    #[instrument(skip(self))]
    pub async fn transform(&self) -> Result<TransformSummary, EtlError> {
        let mut timer = Timer::start();
        info!("Starting transform");

        let removed = self
            .store
            .delete_many(StagingCollection::SequenceCentric, &Filter::all())
            .await?;
        info!(removed, "Cleared sequence-centric documents");

        let reference = self.load_reference_sets().await?;
        info!(
            collections = reference.collections.len(),
            data_sources = reference.data_sources.len(),
            "Loaded reference sets"
        );

        let sequences = self.load_records(EntityKind::Sequence).await?;
        info!(sequences = sequences.len(), "Loaded sequences");

        let mut joins = stream::iter(sequences)
            .map(|sequence| self.build_and_store(sequence, &reference))
            .buffer_unordered(self.concurrency);

        let mut processed: u64 = 0;
        let mut created: u64 = 0;
        while let Some(result) = joins.next().await {
            if result? {
                created += 1;
            }
            processed += 1;
            if processed % PROGRESS_INTERVAL == 0 {
                debug!(processed, created, step_ms = timer.step_ms(), "Transform progress");
            }
        }

        let summary = TransformSummary {
            documents_created: created,
            duration: timer.elapsed_ms(),
        };
        info!(
            processed,
            documents_created = summary.documents_created,
            duration_ms = summary.duration,
            "Finished transform"
        );
        Ok(summary)
    }

    async fn load_records(&self, kind: EntityKind) -> Result<Vec<Record>, EtlError> {
        let values: Vec<Value> = self
            .store
            .find(StagingCollection::from(kind), Filter::all())
            .try_collect()
            .await?;
        Ok(values.into_iter().filter_map(into_record).collect())
    }

    async fn load_reference_sets(&self) -> Result<ReferenceSets, EtlError> {
        let collections = self.load_records(EntityKind::Collection).await?;

        let mut data_sources = HashMap::new();
        for source in self.load_records(EntityKind::DataSource).await? {
            if let Some(id) = source.get(EntityKind::DataSource.id_field()).and_then(id_key) {
                data_sources.entry(id).or_insert(source);
            }
        }

        Ok(ReferenceSets {
            collections,
            data_sources,
        })
    }

    /// Join one sequence and write its document.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - A document was written
    /// * `Ok(false)` - The sequence was skipped
    async fn build_and_store(
        &self,
        sequence: Record,
        reference: &ReferenceSets,
    ) -> Result<bool, EtlError> {
        let Some(sequence_id) = sequence.get("sequence_id").and_then(id_key) else {
            warn!("Skipping staged sequence without sequence_id");
            return Ok(false);
        };

        let files: Vec<Value> = self
            .store
            .find(
                StagingCollection::Source(EntityKind::File),
                Filter::field_eq("sequence_id", sequence_id.as_str()),
            )
            .try_collect()
            .await?;

        let Some(sample) = self
            .find_by_id(EntityKind::Sample, sequence.get(EntityKind::Sample.id_field()))
            .await?
        else {
            return Ok(false);
        };
        let Some(host) = self
            .find_by_id(EntityKind::Host, sample.get(EntityKind::Host.id_field()))
            .await?
        else {
            return Ok(false);
        };

        let collections = reference.collections_for(&host);
        let data_source = reference.data_source_for(&host);
        let files = files.into_iter().filter_map(into_record).collect();

        let Some(document) =
            build_document(sequence, files, sample, host, collections, data_source)
        else {
            warn!(sequence_id = %sequence_id, "Skipping sequence with non-string sequence_id");
            return Ok(false);
        };

        let value = document
            .to_value()
            .map_err(|e| EtlError::document(format!("{}: {}", sequence_id, e)))?;
        self.store
            .insert_one(StagingCollection::SequenceCentric, &value)
            .await?;
        Ok(true)
    }

    /// First staged record of `kind` whose id field equals `id`.
    async fn find_by_id(
        &self,
        kind: EntityKind,
        id: Option<&Value>,
    ) -> Result<Option<Record>, EtlError> {
        let Some(id) = id.and_then(id_key) else {
            return Ok(None);
        };
        let found = self
            .store
            .find_one(
                StagingCollection::from(kind),
                &Filter::field_eq(kind.id_field(), id),
            )
            .await?;
        Ok(found.and_then(into_record))
    }
}

fn into_record(value: Value) -> Option<Record> {
    match value {
        Value::Object(record) => Some(record),
        _ => None,
    }
}
