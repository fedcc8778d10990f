//! # Centric ETL Repository
//!
//! This crate provides traits and implementations for every external system
//! the sequence-centric ETL talks to: the staging store, the Data Connect
//! source API, the Rollcall index registry and the OpenSearch cluster.

pub mod dataconnect;
pub mod errors;
pub mod interfaces;
pub mod lifecycle;
pub mod memory;
pub mod opensearch;
pub mod postgres;
pub mod rollcall;
pub mod types;
pub mod utils;

pub use dataconnect::DataConnectClient;
pub use errors::{LifecycleError, RegistryError, SearchIndexError, SourceError, StagingStoreError};
pub use interfaces::{
    DocumentStream, IndexRegistry, PageFetcher, SearchIndexProvider, StagingStore, StoreConnector,
};
pub use lifecycle::{IndexLifecycle, IndexLifecycleConfig};
pub use memory::{InMemoryConnector, InMemoryStagingStore};
pub use opensearch::{OpenSearchProvider, SearchClusterConfig};
pub use postgres::{PostgresConnector, PostgresStagingStore};
pub use rollcall::RollcallClient;
pub use types::{BulkDocument, CreateIndexRequest, Filter, IndexHandle, IndexReleaseRequest, Page};
