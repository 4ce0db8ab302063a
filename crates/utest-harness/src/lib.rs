//! Offline tooling for utest artefacts.
//!
//! This crate provides:
//! - Results files: load, validate against the schema, summarize
//! - Event logs: validation is re-exported from `utest::structured_log`

#![forbid(unsafe_code)]

pub mod results;

pub use results::{ResultsError, ResultsSummary, load_results, validate_results};
pub use utest::structured_log::{LogValidationError, validate_log_file};
