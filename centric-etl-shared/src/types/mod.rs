//! This module defines the core data structures used across the ETL.

pub mod collection;
pub mod entity;
pub mod run_summary;
pub mod sequence_centric;
pub mod stage;
