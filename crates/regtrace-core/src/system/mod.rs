//! # System Module
//!
//! Whole-graph statistics for regulation graphs.
//!
//! The statistics are pure functions of a [`crate::RegulationGraph`]; file
//! output of the summary table lives in the app layer.

mod summary;

pub use summary::*;
