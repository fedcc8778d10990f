//! # Centric ETL
//!
//! Rebuilds the sequence-centric search index from the Data Connect tables.
//!
//! ## Architecture
//!
//! The ETL follows the Extract-Transform-Load pattern:
//!
//! 1. **Extractor**: Stages every Data Connect table, page by page
//! 2. **Transformer**: Joins staged records into sequence-centric documents
//! 3. **Loader**: Bulk indexes the documents into a new index and releases it
//! 4. **Orchestrator**: Runs the requested stages, one run at a time
//!
//! ## Modules
//!
//! - [`config`]: Configuration and dependency initialization
//! - [`extractor`]: Paginated extraction into the staging store
//! - [`transformer`]: Join and denormalization of staged records
//! - [`loader`]: Batched bulk indexing and index release
//! - [`orchestrator`]: Run execution and the single-flight run queue
//! - [`schedule`]: Recurring all-stages run
//! - [`server`]: HTTP control surface
//! - [`errors`]: Error types for the ETL

pub mod config;
pub mod errors;
pub mod extractor;
pub mod loader;
pub mod orchestrator;
pub mod schedule;
pub mod server;
pub mod timer;
pub mod transformer;

pub use config::{Dependencies, EtlConfig};
pub use errors::{EtlError, ServiceError};
pub use orchestrator::{Orchestrator, RunExecutor, RunQueue, RunRequest};
pub use schedule::RunSchedule;
