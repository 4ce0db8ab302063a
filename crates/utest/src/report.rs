//! End-of-run reporting: console summary and the JSON results file.
//!
//! Console format, one block per failure (written to the error stream):
//!
//! ```text
//!  - Suite @ file.rs:12
//!    "proof": a == b (expected 'a' to be 2, actual = 1)
//! ```
//!
//! Results file: a pretty-printed JSON array of [`ResultEntry`], passed
//! proofs first in pass order, then one entry per failure record.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::failure::FailureRecord;
use crate::registry::Registry;

/// Value of the `type` field of every results entry.
pub const RESULT_KIND: &str = "unittest";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("results serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// One element of the results file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub passed: bool,
}

impl ResultEntry {
    /// Entry for proof id `name`; double quotes become single quotes.
    #[must_use]
    pub fn new(name: &str, passed: bool) -> Self {
        Self {
            kind: RESULT_KIND.to_string(),
            name: name.replace('"', "'"),
            passed,
        }
    }
}

/// Snapshot of a finished run.
#[derive(Debug, Clone, Default)]
pub struct Report {
    passes: Vec<String>,
    failures: Vec<FailureRecord>,
}

impl Report {
    #[must_use]
    pub fn new(passes: Vec<String>, failures: Vec<FailureRecord>) -> Self {
        Self { passes, failures }
    }

    #[must_use]
    pub fn from_registry(registry: &Registry) -> Self {
        Self::new(registry.passes().snapshot(), registry.failures().snapshot())
    }

    /// True when no failure was recorded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    #[must_use]
    pub fn passes(&self) -> &[String] {
        &self.passes
    }

    #[must_use]
    pub fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    /// Print `Result: OK|FAILED` to `out` and the failure details to `err`.
    pub fn write_summary(&self, out: &mut dyn Write, err: &mut dyn Write) -> std::io::Result<()> {
        writeln!(out, "Result: {}", if self.is_ok() { "OK" } else { "FAILED" })?;
        out.flush()?;
        for failure in &self.failures {
            writeln!(
                err,
                " - {} @ {}\n   \"{}\": {} (expected '{}' to be {}, actual = {})",
                failure.suite_name,
                failure.location,
                failure.proof_name,
                failure.test,
                failure.actual_str,
                failure.expected,
                failure.actual,
            )?;
        }
        err.flush()
    }

    #[must_use]
    pub fn entries(&self) -> Vec<ResultEntry> {
        self.passes
            .iter()
            .map(|id| ResultEntry::new(id, true))
            .chain(
                self.failures
                    .iter()
                    .map(|failure| ResultEntry::new(&failure.proof_id(), false)),
            )
            .collect()
    }

    /// Serialize the results array, two-space indented, with a trailing newline.
    pub fn write_results(&self, writer: &mut dyn Write) -> Result<(), ReportError> {
        serde_json::to_writer_pretty(&mut *writer, &self.entries())?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn write_results_file(&self, path: &Path) -> Result<(), ReportError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_results(&mut writer)
    }
}

/// Console report for a run aborted by an error escaping `proof`.
pub fn write_uncaught(
    out: &mut dyn Write,
    proof: &str,
    message: Option<&str>,
) -> std::io::Result<()> {
    writeln!(out, "Result: FAILED")?;
    match message {
        Some(message) => writeln!(out, " - Uncaught exception in '{proof}': {message}")?,
        None => writeln!(out, " - Uncaught exception in '{proof}'")?,
    }
    out.flush()
}
