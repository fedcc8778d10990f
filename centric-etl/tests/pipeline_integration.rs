//! Integration tests for the pipeline.
//!
//! These tests run the real Orchestrator over an in-memory staging store with
//! mock source, registry and search cluster.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use centric_etl::loader::BulkLoader;
use centric_etl::orchestrator::{Orchestrator, RunQueue};
use centric_etl::EtlError;
use centric_etl_repository::{Page, PageFetcher, SearchIndexError, SourceError};
use centric_etl_shared::{EntityKind, Stage, StageSet, StagingCollection};
use serde_json::{json, Value};

use common::{events_of, Harness, ALIAS, INDEX_NAME};

const SEQUENCES: StagingCollection = StagingCollection::Source(EntityKind::Sequence);
const HOSTS: StagingCollection = StagingCollection::Source(EntityKind::Host);

fn stages(list: &[Stage]) -> StageSet {
    list.iter().copied().collect()
}

fn centric_for<'a>(documents: &'a [Value], sequence_id: &str) -> Option<&'a Value> {
    documents
        .iter()
        .find(|document| document["sequence_id"] == sequence_id)
}

#[tokio::test]
async fn test_extract_and_load_without_transform_is_rejected() {
    let harness = Harness::new();
    harness.seed(SEQUENCES, vec![json!({"sequence_id": "S0"})]).await;
    harness
        .seed(StagingCollection::SequenceCentric, vec![json!({"sequence_id": "S0"})])
        .await;
    harness
        .fetcher
        .set_records(EntityKind::Sequence, vec![json!({"sequence_id": "S1"})]);

    let summary = harness
        .orchestrator()
        .run_stages(stages(&[Stage::Load, Stage::Extract]), "test")
        .await;

    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("EXTRACT and LOAD requested without TRANSFORM"));
    assert!(summary.extract.is_none());
    assert!(summary.load.is_none());
    assert!(summary.end.is_some());

    // Nothing ran and nothing was touched
    assert_eq!(harness.connector.connect_count(), 0);
    assert!(events_of(&harness.events).is_empty());
    assert_eq!(harness.documents(SEQUENCES), vec![json!({"sequence_id": "S0"})]);
    assert_eq!(
        harness.documents(StagingCollection::SequenceCentric),
        vec![json!({"sequence_id": "S0"})]
    );
    assert!(harness.documents(StagingCollection::Runs).is_empty());
}

#[tokio::test]
async fn test_extract_stages_every_page_and_skips_empty_ones() {
    let harness = Harness::new();
    harness.fetcher.set_table(
        EntityKind::Host,
        vec![
            vec![json!({"host_id": "H1"}), json!({"host_id": "H2"})],
            vec![],
            vec![json!({"host_id": "H3"})],
        ],
    );

    let summary = harness
        .orchestrator()
        .run_stages(StageSet::only(Stage::Extract), "test")
        .await;

    assert!(summary.succeeded(), "errors: {:?}", summary.errors);
    let extract = summary.extract.unwrap();
    assert_eq!(extract.counts[&EntityKind::Host], 3);
    assert_eq!(extract.counts[&EntityKind::Sequence], 0);
    assert_eq!(extract.counts.len(), 6);

    let hosts: Vec<Value> = harness.documents(HOSTS);
    assert_eq!(
        hosts,
        vec![
            json!({"host_id": "H1"}),
            json!({"host_id": "H2"}),
            json!({"host_id": "H3"})
        ]
    );
}

#[tokio::test]
async fn test_reextraction_with_empty_source_clears_collection() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator();
    harness.fetcher.set_records(
        EntityKind::Host,
        vec![json!({"host_id": "H1"}), json!({"host_id": "H2"})],
    );

    let first = orchestrator
        .run_stages(StageSet::only(Stage::Extract), "test")
        .await;
    assert_eq!(first.extract.unwrap().counts[&EntityKind::Host], 2);
    assert_eq!(harness.documents(HOSTS).len(), 2);

    harness.fetcher.set_table(EntityKind::Host, vec![]);
    let second = orchestrator
        .run_stages(StageSet::only(Stage::Extract), "test")
        .await;

    assert!(second.succeeded());
    // Counters are per call, not cumulative
    assert_eq!(second.extract.unwrap().counts[&EntityKind::Host], 0);
    assert!(harness.documents(HOSTS).is_empty());
}

#[tokio::test]
async fn test_end_to_end_document() {
    let harness = Harness::new();
    harness.serve_tables([
        (EntityKind::Sequence, vec![json!({"sequence_id": "S1", "sample_id": "SM1"})]),
        (EntityKind::Sample, vec![json!({"sample_id": "SM1", "host_id": "H1"})]),
        (
            EntityKind::Host,
            vec![json!({"host_id": "H1", "collection_ids": ["C1"], "data_source_id": "D1"})],
        ),
        (EntityKind::Collection, vec![json!({"collection_id": "C1"})]),
        (EntityKind::DataSource, vec![json!({"data_source_id": "D1"})]),
        (EntityKind::File, vec![]),
    ]);

    let summary = harness
        .orchestrator()
        .run_stages(stages(&[Stage::Extract, Stage::Transform]), "test")
        .await;

    assert!(summary.succeeded(), "errors: {:?}", summary.errors);
    assert_eq!(summary.transform.unwrap().documents_created, 1);
    assert_eq!(
        harness.documents(StagingCollection::SequenceCentric),
        vec![json!({
            "sequence_id": "S1",
            "files": [],
            "sample": {"sample_id": "SM1"},
            "host": {"host_id": "H1"},
            "collections": [{"collection_id": "C1"}],
            "data_source": {"data_source_id": "D1"}
        })]
    );
}

#[tokio::test]
async fn test_sequence_with_missing_host_is_skipped() {
    let harness = Harness::new();
    harness
        .seed(
            SEQUENCES,
            vec![
                json!({"sequence_id": "S1", "sample_id": "SM1"}),
                json!({"sequence_id": "S2", "sample_id": "SM2"}),
                json!({"sequence_id": "S3", "sample_id": "SM-missing"}),
            ],
        )
        .await;
    harness
        .seed(
            StagingCollection::Source(EntityKind::Sample),
            vec![
                json!({"sample_id": "SM1", "host_id": "H-missing"}),
                json!({"sample_id": "SM2", "host_id": "H2"}),
            ],
        )
        .await;
    harness.seed(HOSTS, vec![json!({"host_id": "H2"})]).await;

    let summary = harness
        .orchestrator()
        .run_stages(StageSet::only(Stage::Transform), "test")
        .await;

    assert!(summary.succeeded(), "errors: {:?}", summary.errors);
    assert_eq!(summary.transform.unwrap().documents_created, 1);

    let documents = harness.documents(StagingCollection::SequenceCentric);
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0]["sequence_id"], "S2");
    // No data source staged for H2
    assert!(documents[0].get("data_source").is_none());
}

#[tokio::test]
async fn test_joins_files_and_intersects_collections() {
    let harness = Harness::new();
    harness
        .seed(
            SEQUENCES,
            vec![
                json!({"sequence_id": "S1", "sample_id": "SM1"}),
                json!({"sequence_id": "S2", "sample_id": "SM1"}),
            ],
        )
        .await;
    harness
        .seed(
            StagingCollection::Source(EntityKind::File),
            vec![
                json!({"file_id": "F1", "sequence_id": "S1"}),
                json!({"file_id": "F2", "sequence_id": "S2"}),
                json!({"file_id": "F3", "sequence_id": "S1"}),
            ],
        )
        .await;
    harness
        .seed(
            StagingCollection::Source(EntityKind::Sample),
            vec![json!({"sample_id": "SM1", "host_id": "H1"})],
        )
        .await;
    harness
        .seed(
            HOSTS,
            vec![json!({"host_id": "H1", "collection_ids": ["c1", "c3"], "data_source_id": "D1"})],
        )
        .await;
    harness
        .seed(
            StagingCollection::Source(EntityKind::Collection),
            vec![json!({"collection_id": "c1"}), json!({"collection_id": "c2"})],
        )
        .await;

    let summary = harness
        .orchestrator()
        .run_stages(StageSet::only(Stage::Transform), "test")
        .await;

    assert!(summary.succeeded(), "errors: {:?}", summary.errors);
    assert_eq!(summary.transform.unwrap().documents_created, 2);

    let documents = harness.documents(StagingCollection::SequenceCentric);
    let s1 = centric_for(&documents, "S1").unwrap();
    assert_eq!(s1["files"], json!([{"file_id": "F1"}, {"file_id": "F3"}]));
    assert_eq!(s1["collections"], json!([{"collection_id": "c1"}]));
    assert!(s1.get("data_source").is_none());

    let s2 = centric_for(&documents, "S2").unwrap();
    assert_eq!(s2["files"], json!([{"file_id": "F2"}]));
}

#[tokio::test]
async fn test_numeric_fields_are_coerced() {
    let harness = Harness::new();
    harness
        .seed(
            SEQUENCES,
            vec![json!({
                "sequence_id": "S1",
                "sample_id": "SM1",
                "consensus_genome_length": "12345",
                "number_base_pairs_sequenced": "N/A"
            })],
        )
        .await;
    harness
        .seed(
            StagingCollection::Source(EntityKind::Sample),
            vec![json!({"sample_id": "SM1", "host_id": "H1"})],
        )
        .await;
    harness
        .seed(
            HOSTS,
            vec![json!({"host_id": "H1", "number_of_vaccine_doses_received": ""})],
        )
        .await;

    harness
        .orchestrator()
        .run_stages(StageSet::only(Stage::Transform), "test")
        .await;

    let documents = harness.documents(StagingCollection::SequenceCentric);
    let document = centric_for(&documents, "S1").unwrap();
    assert_eq!(document["consensus_genome_length"], json!(12345));
    assert!(document.get("number_base_pairs_sequenced").is_none());
    assert!(document["host"].get("number_of_vaccine_doses_received").is_none());
}

#[tokio::test]
async fn test_load_submits_full_batches_then_releases() {
    let harness = Harness::new();
    let documents: Vec<Value> = (0..125)
        .map(|i| json!({"sequence_id": format!("S{:03}", i), "files": []}))
        .collect();
    harness
        .seed(StagingCollection::SequenceCentric, documents)
        .await;

    let summary = harness
        .orchestrator()
        .run_stages(StageSet::only(Stage::Load), "test")
        .await;

    assert!(summary.succeeded(), "errors: {:?}", summary.errors);
    assert_eq!(summary.load.unwrap().index, INDEX_NAME);

    assert_eq!(harness.provider.batch_sizes(), vec![50, 50, 25]);
    assert_eq!(
        events_of(&harness.events),
        vec![
            "create".to_string(),
            format!("close:{}", INDEX_NAME),
            format!("mapping:{}", INDEX_NAME),
            format!("open:{}", INDEX_NAME),
            format!("bulk:{}:50", INDEX_NAME),
            format!("bulk:{}:50", INDEX_NAME),
            format!("bulk:{}:25", INDEX_NAME),
            format!("release:{}", ALIAS),
        ]
    );

    // Documents keep their staging order and are keyed by sequence_id
    let bulks = harness.provider.bulks.lock().unwrap();
    assert_eq!(bulks[0][0].id, "S000");
    assert_eq!(bulks[2][24].id, "S124");
    assert_eq!(bulks[1][0].source["sequence_id"], "S050");

    let released = harness.registry.released.lock().unwrap();
    assert_eq!(released.len(), 1);
    assert_eq!(released[0].release, "re_7");
    assert_eq!(released[0].shards, vec!["source_dnastack".to_string()]);
}

#[tokio::test]
async fn test_load_of_exact_batch_multiple_releases_after_last_full_batch() {
    let harness = Harness::new();
    let documents: Vec<Value> = (0..100)
        .map(|i| json!({"sequence_id": format!("S{:03}", i)}))
        .collect();
    harness
        .seed(StagingCollection::SequenceCentric, documents)
        .await;

    let summary = harness
        .orchestrator()
        .run_stages(StageSet::only(Stage::Load), "test")
        .await;

    assert!(summary.succeeded(), "errors: {:?}", summary.errors);
    assert_eq!(harness.provider.batch_sizes(), vec![50, 50]);
    assert_eq!(
        events_of(&harness.events),
        vec![
            "create".to_string(),
            format!("close:{}", INDEX_NAME),
            format!("mapping:{}", INDEX_NAME),
            format!("open:{}", INDEX_NAME),
            format!("bulk:{}:50", INDEX_NAME),
            format!("bulk:{}:50", INDEX_NAME),
            format!("release:{}", ALIAS),
        ]
    );
    assert_eq!(harness.registry.released.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_rejected_bulk_aborts_load_without_release() {
    let harness = Harness::new();
    let documents: Vec<Value> = (0..125)
        .map(|i| json!({"sequence_id": format!("S{:03}", i)}))
        .collect();
    harness
        .seed(StagingCollection::SequenceCentric, documents)
        .await;
    harness.provider.fail_bulk(2);

    let summary = harness
        .orchestrator()
        .run_stages(StageSet::only(Stage::Load), "test")
        .await;

    assert!(!summary.succeeded());
    assert!(summary.load.is_none());
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("mapper_parsing_exception"));

    // The first batch went in, the second was rejected and nothing followed
    assert_eq!(harness.provider.batch_sizes(), vec![50]);
    assert!(harness.registry.released.lock().unwrap().is_empty());
    assert_eq!(
        events_of(&harness.events),
        vec![
            "create".to_string(),
            format!("close:{}", INDEX_NAME),
            format!("mapping:{}", INDEX_NAME),
            format!("open:{}", INDEX_NAME),
            format!("bulk:{}:50", INDEX_NAME),
            format!("bulk-rejected:{}:50", INDEX_NAME),
        ]
    );

    let runs = harness.documents(StagingCollection::Runs);
    assert_eq!(runs.len(), 1);
    assert!(runs[0]["load"].is_null());
    assert_eq!(runs[0]["errors"].as_array().unwrap().len(), 1);
    assert_eq!(harness.connector.store().close_count(), 1);
}

#[tokio::test]
async fn test_bulk_loader_returns_the_rejection() {
    let harness = Harness::new();
    harness
        .seed(
            StagingCollection::SequenceCentric,
            vec![json!({"sequence_id": "S1"}), json!({"sequence_id": "S2"})],
        )
        .await;
    harness.provider.fail_bulk(1);

    let loader = BulkLoader::new(harness.connector.store(), Arc::new(harness.lifecycle()));
    let result = loader.load().await;

    assert!(matches!(
        result,
        Err(EtlError::SearchIndex(SearchIndexError::BulkIndexError(_)))
    ));
    assert!(harness.registry.released.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_stage_stops_run_and_is_recorded() {
    let harness = Harness::new();
    harness.fetcher.fail(EntityKind::Sequence);

    let summary = harness
        .orchestrator()
        .run_stages(StageSet::all(), "test")
        .await;

    assert!(!summary.succeeded());
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("connection refused"));
    assert!(summary.extract.is_none());
    assert!(summary.transform.is_none());
    assert!(summary.load.is_none());
    assert!(events_of(&harness.events).is_empty());

    let runs = harness.documents(StagingCollection::Runs);
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0]["errors"].as_array().unwrap().len(), 1);
    assert!(runs[0]["duration"].is_u64());

    assert_eq!(harness.connector.connect_count(), 1);
    assert_eq!(harness.connector.store().close_count(), 1);
}

/// Source whose every page request panics.
struct PanickingFetcher;

#[async_trait]
impl PageFetcher for PanickingFetcher {
    fn table_url(&self, kind: EntityKind) -> String {
        format!("mock://{}/0", kind.table_name())
    }

    async fn fetch_page(&self, _url: &str) -> Result<Page, SourceError> {
        panic!("page decoder crashed");
    }
}

#[tokio::test]
async fn test_panicking_stage_is_recorded_and_session_closed() {
    let harness = Harness::new();
    let orchestrator = Orchestrator::new(
        Arc::new(harness.connector.clone()),
        Arc::new(PanickingFetcher),
        Arc::new(harness.lifecycle()),
    );

    let summary = orchestrator.run_stages(StageSet::all(), "test").await;

    assert!(!summary.succeeded());
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("page decoder crashed"));
    assert!(summary.extract.is_none());

    let runs = harness.documents(StagingCollection::Runs);
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0]["trigger"], "test");
    assert!(harness.connector.store().is_closed());
    assert_eq!(harness.connector.store().close_count(), 1);
}

#[tokio::test]
async fn test_full_run_records_one_summary() {
    let harness = Harness::new();
    harness.serve_tables([
        (EntityKind::Sequence, vec![json!({"sequence_id": "S1", "sample_id": "SM1"})]),
        (EntityKind::Sample, vec![json!({"sample_id": "SM1", "host_id": "H1"})]),
        (EntityKind::Host, vec![json!({"host_id": "H1"})]),
        (EntityKind::Collection, vec![]),
        (EntityKind::DataSource, vec![]),
        (EntityKind::File, vec![json!({"file_id": "F1", "sequence_id": "S1"})]),
    ]);

    let summary = harness
        .orchestrator()
        .run_stages(StageSet::all(), "schedule")
        .await;

    assert!(summary.succeeded(), "errors: {:?}", summary.errors);
    assert!(summary.extract.is_some());
    assert_eq!(summary.transform.as_ref().unwrap().documents_created, 1);
    assert_eq!(harness.provider.batch_sizes(), vec![1]);

    let runs = harness.documents(StagingCollection::Runs);
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0]["trigger"], "schedule");
    assert_eq!(runs[0]["stages"], json!(["EXTRACT", "TRANSFORM", "LOAD"]));
    assert_eq!(runs[0]["transform"]["documentsCreated"], 1);
    assert_eq!(runs[0]["load"]["index"], INDEX_NAME);
    assert_eq!(runs[0]["extract"]["counts"]["files"], 1);

    assert!(harness.connector.store().is_closed());
    assert_eq!(harness.connector.store().close_count(), 1);
}

#[tokio::test]
async fn test_queued_runs_execute_in_submission_order() {
    let harness = Harness::new();
    let queue = RunQueue::start(Arc::new(harness.orchestrator()));

    for i in 0..3 {
        queue
            .submit(StageSet::only(Stage::Transform), format!("run-{}", i))
            .unwrap();
    }
    queue.shutdown().await;

    let triggers: Vec<Value> = harness
        .documents(StagingCollection::Runs)
        .into_iter()
        .map(|run| run["trigger"].clone())
        .collect();
    assert_eq!(triggers, vec![json!("run-0"), json!("run-1"), json!("run-2")]);
    assert_eq!(harness.connector.connect_count(), 3);
    assert_eq!(harness.connector.store().close_count(), 3);
    assert_eq!(queue.status().completed, 3);
}
