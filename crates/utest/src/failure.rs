//! Failure records and the append-only result tables of a run.

use std::fmt;

use parking_lot::Mutex;
use serde::Serialize;

/// Source position of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub file: &'static str,
    pub line: u32,
}

impl Location {
    #[must_use]
    pub const fn new(file: &'static str, line: u32) -> Self {
        Self { file, line }
    }

    /// Position of the caller.
    #[must_use]
    #[track_caller]
    pub fn caller() -> Self {
        let loc = std::panic::Location::caller();
        Self {
            file: loc.file(),
            line: loc.line(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// One recorded discrepancy. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub suite_name: String,
    pub proof_name: String,
    pub location: Location,
    /// Human readable description of the check.
    pub test: String,
    pub actual: String,
    pub expected: String,
    /// Literal source text of the actual-value expression.
    pub actual_str: String,
}

impl FailureRecord {
    /// `<suite>::<proof>` identifier used in reports.
    #[must_use]
    pub fn proof_id(&self) -> String {
        proof_id(&self.suite_name, &self.proof_name)
    }
}

#[must_use]
pub fn proof_id(suite_name: &str, proof_name: &str) -> String {
    format!("{suite_name}::{proof_name}")
}

/// Process-wide ordered list of failures. Only grows during a run.
#[derive(Debug, Default)]
pub struct FailureLog {
    records: Mutex<Vec<FailureRecord>>,
}

impl FailureLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, record: FailureRecord) {
        self.records.lock().push(record);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Copy of every record appended at or after `start`.
    #[must_use]
    pub fn since(&self, start: usize) -> Vec<FailureRecord> {
        self.records
            .lock()
            .get(start..)
            .map(<[FailureRecord]>::to_vec)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<FailureRecord> {
        self.since(0)
    }

    pub(crate) fn clear(&self) {
        self.records.lock().clear();
    }
}

/// Ordered `<suite>::<proof>` ids of proofs that passed.
#[derive(Debug, Default)]
pub struct PassList {
    proofs: Mutex<Vec<String>>,
}

impl PassList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, suite_name: &str, proof_name: &str) {
        self.proofs.lock().push(proof_id(suite_name, proof_name));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.proofs.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proofs.lock().is_empty()
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        self.proofs.lock().clone()
    }

    pub(crate) fn clear(&self) {
        self.proofs.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn record(proof: &str) -> FailureRecord {
        FailureRecord {
            suite_name: "Suite".to_string(),
            proof_name: proof.to_string(),
            location: Location::new("x.rs", 7),
            test: "a == b".to_string(),
            actual: "1".to_string(),
            expected: "2".to_string(),
            actual_str: "a".to_string(),
        }
    }

    #[test]
    fn since_returns_only_new_records() {
        let log = FailureLog::new();
        log.push(record("first"));
        let mark = log.len();
        log.push(record("second"));
        log.push(record("third"));

        let fresh = log.since(mark);
        assert_eq!(fresh.len(), 2);
        assert_eq!(fresh[0].proof_name, "second");
        assert!(log.since(10).is_empty());
    }

    #[test]
    fn concurrent_appends_are_all_kept() {
        let log = Arc::new(FailureLog::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    for _ in 0..50 {
                        log.push(record("threaded"));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("appender");
        }
        assert_eq!(log.len(), 200);
    }

    #[test]
    fn pass_list_uses_qualified_ids() {
        let passes = PassList::new();
        passes.record("Math", "adds");
        assert_eq!(passes.snapshot(), vec!["Math::adds".to_string()]);
        assert_eq!(record("p").proof_id(), "Suite::p");
        assert_eq!(Location::new("a.rs", 3).to_string(), "a.rs:3");
    }
}
