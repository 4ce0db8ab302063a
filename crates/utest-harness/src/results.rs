//! Results file loading, validation and summaries.

use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use utest::ResultEntry;
use utest::report::RESULT_KIND;

#[derive(Debug, Error)]
pub enum ResultsError {
    #[error("failed to read results file: {0}")]
    Io(#[from] std::io::Error),
    #[error("results file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{} schema violation(s), first: {}", .0.len(), .0.first().map(String::as_str).unwrap_or(""))]
    Schema(Vec<String>),
}

/// Check a parsed results document.
///
/// Returns every violation found; an empty list means the document is a
/// well-formed results array.
#[must_use]
pub fn validate_results(value: &serde_json::Value) -> Vec<String> {
    let Some(entries) = value.as_array() else {
        return vec!["top level: expected JSON array".to_string()];
    };

    let mut violations = Vec::new();
    let mut seen_failure = false;
    for (index, entry) in entries.iter().enumerate() {
        let Some(obj) = entry.as_object() else {
            violations.push(format!("entry {index}: expected JSON object"));
            continue;
        };

        match obj.get("type").and_then(|v| v.as_str()) {
            Some(RESULT_KIND) => {}
            Some(other) => violations.push(format!("entry {index}: unknown type '{other}'")),
            None => violations.push(format!("entry {index}: missing string field 'type'")),
        }

        match obj.get("name").and_then(|v| v.as_str()) {
            Some(name) if !name.contains("::") => violations.push(format!(
                "entry {index}: name '{name}' is not of the form <suite>::<proof>"
            )),
            Some(name) if name.contains('"') => {
                violations.push(format!("entry {index}: name '{name}' contains a double quote"));
            }
            Some(_) => {}
            None => violations.push(format!("entry {index}: missing string field 'name'")),
        }

        match obj.get("passed").and_then(|v| v.as_bool()) {
            // Passed entries all precede failed ones.
            Some(true) if seen_failure => violations.push(format!(
                "entry {index}: passed entry listed after a failed one"
            )),
            Some(true) => {}
            Some(false) => seen_failure = true,
            None => violations.push(format!("entry {index}: missing boolean field 'passed'")),
        }

        for key in obj.keys() {
            if !["type", "name", "passed"].contains(&key.as_str()) {
                violations.push(format!("entry {index}: unexpected field '{key}'"));
            }
        }
    }
    violations
}

/// Read, validate and deserialize a results file.
pub fn load_results(path: &Path) -> Result<Vec<ResultEntry>, ResultsError> {
    let text = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    let violations = validate_results(&value);
    if !violations.is_empty() {
        return Err(ResultsError::Schema(violations));
    }
    Ok(serde_json::from_value(value)?)
}

/// Counts over a results file.
///
/// `failed` counts failure records, so a proof with three failed checks
/// contributes three; `failed_proofs` lists each failing proof once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultsSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub failed_proofs: Vec<String>,
}

impl ResultsSummary {
    #[must_use]
    pub fn from_entries(entries: &[ResultEntry]) -> Self {
        let mut summary = Self {
            total: entries.len(),
            ..Self::default()
        };
        for entry in entries {
            if entry.passed {
                summary.passed += 1;
            } else {
                summary.failed += 1;
                if !summary.failed_proofs.contains(&entry.name) {
                    summary.failed_proofs.push(entry.name.clone());
                }
            }
        }
        summary
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.failed == 0
    }

    /// Plain-text rendering.
    #[must_use]
    pub fn to_plain(&self) -> String {
        let mut out = format!(
            "Result: {}\npassed: {}\nfailed: {} ({} proof(s))\n",
            if self.is_ok() { "OK" } else { "FAILED" },
            self.passed,
            self.failed,
            self.failed_proofs.len()
        );
        for name in &self.failed_proofs {
            out.push_str(&format!(" - {name}\n"));
        }
        out
    }
}
