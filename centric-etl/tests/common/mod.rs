//! Mock collaborators shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use centric_etl::orchestrator::Orchestrator;
use centric_etl_repository::types::Pagination;
use centric_etl_repository::{
    BulkDocument, CreateIndexRequest, IndexHandle, IndexLifecycle, IndexLifecycleConfig,
    IndexRegistry, IndexReleaseRequest, InMemoryConnector, Page, PageFetcher, RegistryError,
    SearchIndexError, SearchIndexProvider, SourceError, StagingStore,
};
use centric_etl_shared::{EntityKind, Record, StagingCollection};
use serde_json::Value;

pub const INDEX_NAME: &str = "covid_centric_source_dnastack_re_7";
pub const ALIAS: &str = "covid_centric";

/// Ordered log of registry and cluster calls.
pub type Events = Arc<Mutex<Vec<String>>>;

pub fn events_of(events: &Events) -> Vec<String> {
    events.lock().unwrap().clone()
}

fn to_record(value: Value) -> Record {
    value.as_object().cloned().expect("test records are objects")
}

/// Serves fixed pages per table under `mock://{table}/{page}` URLs.
#[derive(Default)]
pub struct MockFetcher {
    tables: Mutex<HashMap<&'static str, Vec<Vec<Record>>>>,
    failing: Mutex<HashSet<&'static str>>,
}

impl MockFetcher {
    /// Replace the pages served for `kind`.
    pub fn set_table(&self, kind: EntityKind, pages: Vec<Vec<Value>>) {
        let pages = pages
            .into_iter()
            .map(|page| page.into_iter().map(to_record).collect())
            .collect();
        self.tables.lock().unwrap().insert(kind.table_name(), pages);
    }

    /// Serve `records` as a single page for `kind`.
    pub fn set_records(&self, kind: EntityKind, records: Vec<Value>) {
        self.set_table(kind, vec![records]);
    }

    /// Make every fetch of `kind` fail.
    pub fn fail(&self, kind: EntityKind) {
        self.failing.lock().unwrap().insert(kind.table_name());
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    fn table_url(&self, kind: EntityKind) -> String {
        format!("mock://{}/0", kind.table_name())
    }

    async fn fetch_page(&self, url: &str) -> Result<Page, SourceError> {
        let path = url.trim_start_matches("mock://");
        let (table, number) = path
            .split_once('/')
            .ok_or_else(|| SourceError::decode(url, "bad mock url"))?;
        let number: usize = number
            .parse()
            .map_err(|_| SourceError::decode(url, "bad page number"))?;

        if self.failing.lock().unwrap().contains(table) {
            return Err(SourceError::transport(url, "connection refused"));
        }

        let tables = self.tables.lock().unwrap();
        let pages = tables.get(table).cloned().unwrap_or_default();
        let next_page_url = (number + 1 < pages.len()).then(|| format!("mock://{}/{}", table, number + 1));

        Ok(Page {
            data: pages.get(number).cloned().unwrap_or_default(),
            pagination: Pagination { next_page_url },
        })
    }
}

/// Registry issuing one fixed index and acknowledging every release.
pub struct MockRegistry {
    events: Events,
    pub released: Mutex<Vec<IndexReleaseRequest>>,
}

impl MockRegistry {
    pub fn new(events: Events) -> Self {
        Self {
            events,
            released: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl IndexRegistry for MockRegistry {
    async fn create_index(&self, request: &CreateIndexRequest) -> Result<IndexHandle, RegistryError> {
        self.events.lock().unwrap().push("create".to_string());
        Ok(IndexHandle {
            index_name: INDEX_NAME.to_string(),
            entity: request.entity.clone(),
            index_type: request.index_type.clone(),
            shard_prefix: request.shard_prefix.clone(),
            shard: request.shard.clone(),
            release_prefix: request.release_prefix.clone(),
            release: "7".to_string(),
            valid: true,
        })
    }

    async fn release_alias(&self, request: &IndexReleaseRequest) -> Result<bool, RegistryError> {
        self.events
            .lock()
            .unwrap()
            .push(format!("release:{}", request.alias));
        self.released.lock().unwrap().push(request.clone());
        Ok(true)
    }
}

/// Cluster recording admin calls and the ids of every bulk request.
pub struct MockProvider {
    events: Events,
    pub bulks: Mutex<Vec<Vec<BulkDocument>>>,
    bulk_calls: AtomicUsize,
    failing_bulk: Mutex<Option<usize>>,
}

impl MockProvider {
    pub fn new(events: Events) -> Self {
        Self {
            events,
            bulks: Mutex::new(Vec::new()),
            bulk_calls: AtomicUsize::new(0),
            failing_bulk: Mutex::new(None),
        }
    }

    /// Reject the `nth` non-empty bulk request (1-based) with an item error.
    pub fn fail_bulk(&self, nth: usize) {
        *self.failing_bulk.lock().unwrap() = Some(nth);
    }

    /// Batch sizes of the non-empty bulk requests, in order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.bulks.lock().unwrap().iter().map(Vec::len).collect()
    }
}

#[async_trait]
impl SearchIndexProvider for MockProvider {
    async fn ping(&self) -> Result<(), SearchIndexError> {
        Ok(())
    }

    async fn close_index(&self, index: &str) -> Result<(), SearchIndexError> {
        self.events.lock().unwrap().push(format!("close:{}", index));
        Ok(())
    }

    async fn put_mapping(&self, index: &str, _mapping: &Value) -> Result<(), SearchIndexError> {
        self.events.lock().unwrap().push(format!("mapping:{}", index));
        Ok(())
    }

    async fn open_index(&self, index: &str) -> Result<(), SearchIndexError> {
        self.events.lock().unwrap().push(format!("open:{}", index));
        Ok(())
    }

    async fn bulk_index(&self, index: &str, documents: &[BulkDocument]) -> Result<(), SearchIndexError> {
        if documents.is_empty() {
            return Ok(());
        }
        let call = self.bulk_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if *self.failing_bulk.lock().unwrap() == Some(call) {
            self.events
                .lock()
                .unwrap()
                .push(format!("bulk-rejected:{}:{}", index, documents.len()));
            return Err(SearchIndexError::bulk_index(format!(
                "{} of {} documents failed: mapper_parsing_exception",
                documents.len(),
                documents.len()
            )));
        }
        self.events
            .lock()
            .unwrap()
            .push(format!("bulk:{}:{}", index, documents.len()));
        self.bulks.lock().unwrap().push(documents.to_vec());
        Ok(())
    }
}

/// A pipeline over an in-memory staging store and mock collaborators.
pub struct Harness {
    pub connector: InMemoryConnector,
    pub fetcher: Arc<MockFetcher>,
    pub registry: Arc<MockRegistry>,
    pub provider: Arc<MockProvider>,
    pub events: Events,
}

impl Harness {
    pub fn new() -> Self {
        let events: Events = Arc::new(Mutex::new(Vec::new()));
        Self {
            connector: InMemoryConnector::new(),
            fetcher: Arc::new(MockFetcher::default()),
            registry: Arc::new(MockRegistry::new(events.clone())),
            provider: Arc::new(MockProvider::new(events.clone())),
            events,
        }
    }

    pub fn lifecycle(&self) -> IndexLifecycle {
        IndexLifecycle::new(
            self.registry.clone(),
            self.provider.clone(),
            IndexLifecycleConfig::new(ALIAS, "covid"),
        )
    }

    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(
            Arc::new(self.connector.clone()),
            self.fetcher.clone(),
            Arc::new(self.lifecycle()),
        )
    }

    /// Insert documents directly into the staging store.
    pub async fn seed(&self, collection: StagingCollection, documents: Vec<Value>) {
        self.connector
            .store()
            .insert_many(collection, &documents)
            .await
            .unwrap();
    }

    pub fn documents(&self, collection: StagingCollection) -> Vec<Value> {
        self.connector.store().documents(collection)
    }

    /// Serve the six tables of a minimal consistent dataset.
    pub fn serve_tables(&self, tables: [(EntityKind, Vec<Value>); 6]) {
        for (kind, records) in tables {
            self.fetcher.set_records(kind, records);
        }
    }
}
