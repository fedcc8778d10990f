//! # Centric ETL Shared
//!
//! This crate defines shared data structures used across the sequence-centric ETL.
//! It includes the source entity kinds, pipeline stages, staging collections,
//! the denormalized `SequenceCentric` document and run summaries.

pub mod types;

pub use types::collection::StagingCollection;
pub use types::entity::EntityKind;
pub use types::run_summary::{ExtractSummary, LoadSummary, RunSummary, TransformSummary};
pub use types::sequence_centric::{Record, SequenceCentric};
pub use types::stage::{InvalidStageSet, Stage, StageSet};
