//! Per-proof fixture: identity, assertion primitives, time marks and
//! named rendezvous points.
//!
//! A [`Fixture`] is shared by reference with every thread a proof body
//! spawns. Each mutable table sits behind its own lock, so threads may
//! assert, mark time and rendezvous concurrently.

use std::collections::HashMap;
use std::fmt::Debug;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::compare::ProofEq;
use crate::failure::{FailureLog, FailureRecord, Location};
use crate::rendezvous::{DEFAULT_WAIT_TIMEOUT, Rendezvous, RendezvousError};

/// Error escaping a proof body or a checked statement.
pub type ProofError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Return type of proof bodies and setup/teardown callbacks.
pub type ProofResult = Result<(), ProofError>;

/// Poll interval of the `try_assert_*` family.
pub const RETRY_INTERVAL: Duration = Duration::from_millis(25);

/// Returned by time queries that involve a mark never set.
pub const UNSET_MARK: Duration = Duration::MAX;

/// Arrivals a sync point waits for unless told otherwise.
pub const DEFAULT_SYNC_COUNT: u32 = 2;

/// Whether a failed check is written to the failure log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Reporting {
    #[default]
    Record,
    /// Check only; used by the retrying checks on every attempt but the last.
    Silent,
}

impl Reporting {
    const fn records(self) -> bool {
        matches!(self, Self::Record)
    }
}

#[derive(Debug)]
pub struct Fixture {
    suite_name: String,
    proof_name: String,
    failures: Arc<FailureLog>,
    // Keyed by (name, count) so "door1"/2 and "door"/12 stay distinct.
    rendezvous: Mutex<HashMap<(String, u32), Arc<Rendezvous>>>,
    marks: Mutex<HashMap<String, Instant>>,
}

impl Fixture {
    #[must_use]
    pub fn new(
        suite_name: impl Into<String>,
        proof_name: impl Into<String>,
        failures: Arc<FailureLog>,
    ) -> Self {
        Self {
            suite_name: suite_name.into(),
            proof_name: proof_name.into(),
            failures,
            rendezvous: Mutex::new(HashMap::new()),
            marks: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn suite_name(&self) -> &str {
        &self.suite_name
    }

    #[must_use]
    pub fn proof_name(&self) -> &str {
        &self.proof_name
    }

    pub fn add_failure(
        &self,
        location: Location,
        test: impl Into<String>,
        actual: impl Into<String>,
        expected: impl Into<String>,
        actual_str: impl Into<String>,
    ) {
        self.failures.push(FailureRecord {
            suite_name: self.suite_name.clone(),
            proof_name: self.proof_name.clone(),
            location,
            test: test.into(),
            actual: actual.into(),
            expected: expected.into(),
            actual_str: actual_str.into(),
        });
    }

    // -----------------------------------------------------------------------
    // Checks
    // -----------------------------------------------------------------------

    /// Record `actual = false, expected = true` when `pred` does not hold.
    pub fn assert_true(
        &self,
        pred: bool,
        location: Location,
        description: &str,
        reporting: Reporting,
    ) -> bool {
        if !pred && reporting.records() {
            self.add_failure(location, description, "false", "true", description);
        }
        pred
    }

    pub fn assert_eq<A, E>(
        &self,
        actual: &A,
        expected: &E,
        location: Location,
        actual_expr: &str,
        expected_expr: &str,
        reporting: Reporting,
    ) -> bool
    where
        A: ProofEq<E> + Debug + ?Sized,
        E: Debug + ?Sized,
    {
        if actual.proof_eq(expected) {
            return true;
        }
        if reporting.records() {
            self.add_failure(
                location,
                format!("{actual_expr} == {expected_expr}"),
                format!("{actual:?}"),
                format!("{expected:?}"),
                actual_expr,
            );
        }
        false
    }

    /// Run `body`; an `Err` or a panic is recorded as a failure.
    pub fn assert_no_throw<T, Er>(
        &self,
        body: impl FnOnce() -> Result<T, Er>,
        location: Location,
        reporting: Reporting,
    ) -> bool {
        match catch_unwind(AssertUnwindSafe(body)) {
            Ok(Ok(_)) => true,
            Ok(Err(_)) | Err(_) => {
                if reporting.records() {
                    self.add_failure(
                        location,
                        "try {...}",
                        "exception thrown",
                        "thrown",
                        "no exception",
                    );
                }
                false
            }
        }
    }

    /// Run `body` and require it to fail with an error of exactly type `E`.
    ///
    /// Any other error is reported by its description, a panic as
    /// `<unknown>`, and success as `<none>`.
    pub fn assert_throw<E, T, Er>(
        &self,
        body: impl FnOnce() -> Result<T, Er>,
        location: Location,
        expected_kind: &str,
        reporting: Reporting,
    ) -> bool
    where
        E: std::error::Error + 'static,
        Er: Into<ProofError>,
    {
        let actual = match catch_unwind(AssertUnwindSafe(body)) {
            Ok(Ok(_)) => "<none>".to_string(),
            Ok(Err(err)) => {
                let err: ProofError = err.into();
                if err.is::<E>() {
                    return true;
                }
                err.to_string()
            }
            Err(_) => "<unknown>".to_string(),
        };
        if reporting.records() {
            self.add_failure(location, "try {...}", actual, expected_kind, "exception");
        }
        false
    }

    // -----------------------------------------------------------------------
    // Retrying checks
    // -----------------------------------------------------------------------

    /// Poll `attempt` every [`RETRY_INTERVAL`] with [`Reporting::Silent`]
    /// for `timeout / RETRY_INTERVAL` attempts, then once more with
    /// [`Reporting::Record`]. Returns the first success or the last outcome.
    pub fn retry_check(
        &self,
        timeout: Duration,
        mut attempt: impl FnMut(Reporting) -> bool,
    ) -> bool {
        let silent_attempts = timeout.as_millis() / RETRY_INTERVAL.as_millis();
        for _ in 0..silent_attempts {
            if attempt(Reporting::Silent) {
                return true;
            }
            thread::sleep(RETRY_INTERVAL);
        }
        attempt(Reporting::Record)
    }

    pub fn try_assert_true(
        &self,
        mut pred: impl FnMut() -> bool,
        timeout: Duration,
        location: Location,
        description: &str,
    ) -> bool {
        self.retry_check(timeout, |reporting| {
            self.assert_true(pred(), location, description, reporting)
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn try_assert_eq<A, E>(
        &self,
        mut actual: impl FnMut() -> A,
        mut expected: impl FnMut() -> E,
        timeout: Duration,
        location: Location,
        actual_expr: &str,
        expected_expr: &str,
    ) -> bool
    where
        A: ProofEq<E> + Debug,
        E: Debug,
    {
        self.retry_check(timeout, |reporting| {
            let (a, e) = (actual(), expected());
            self.assert_eq(&a, &e, location, actual_expr, expected_expr, reporting)
        })
    }

    pub fn try_assert_no_throw<T, Er>(
        &self,
        mut body: impl FnMut() -> Result<T, Er>,
        timeout: Duration,
        location: Location,
    ) -> bool {
        self.retry_check(timeout, |reporting| {
            self.assert_no_throw(&mut body, location, reporting)
        })
    }

    pub fn try_assert_throw<E, T, Er>(
        &self,
        mut body: impl FnMut() -> Result<T, Er>,
        timeout: Duration,
        location: Location,
        expected_kind: &str,
    ) -> bool
    where
        E: std::error::Error + 'static,
        Er: Into<ProofError>,
    {
        self.retry_check(timeout, |reporting| {
            self.assert_throw::<E, T, Er>(&mut body, location, expected_kind, reporting)
        })
    }

    // -----------------------------------------------------------------------
    // Rendezvous
    // -----------------------------------------------------------------------

    /// The rendezvous registered under `(name, count)`, created on first use.
    pub fn rendezvous(&self, name: &str, count: u32) -> Arc<Rendezvous> {
        let mut table = self.rendezvous.lock();
        Arc::clone(
            table
                .entry((name.to_string(), count))
                .or_insert_with(|| Arc::new(Rendezvous::new(count))),
        )
    }

    /// Arrive at the named sync point and wait for `count` arrivals.
    pub fn sync_point(&self, name: &str, count: u32) -> Result<(), RendezvousError> {
        self.rendezvous(name, count)
            .arrive_and_wait(DEFAULT_WAIT_TIMEOUT)
    }

    /// [`sync_point`](Self::sync_point) for two parties.
    pub fn sync_pair(&self, name: &str) -> Result<(), RendezvousError> {
        self.sync_point(name, DEFAULT_SYNC_COUNT)
    }

    // -----------------------------------------------------------------------
    // Time marks
    // -----------------------------------------------------------------------

    pub fn mark_time(&self, name: &str) {
        self.marks.lock().insert(name.to_string(), Instant::now());
    }

    /// Elapsed time since `name` was marked, or [`UNSET_MARK`].
    #[must_use]
    pub fn time_since_mark(&self, name: &str) -> Duration {
        self.marks
            .lock()
            .get(name)
            .map_or(UNSET_MARK, Instant::elapsed)
    }

    /// `later - earlier`, zero when `later` was marked first, or
    /// [`UNSET_MARK`] when either mark is missing.
    #[must_use]
    pub fn time_between_marks(&self, earlier: &str, later: &str) -> Duration {
        let marks = self.marks.lock();
        match (marks.get(earlier), marks.get(later)) {
            (Some(a), Some(b)) => b.saturating_duration_since(*a),
            _ => UNSET_MARK,
        }
    }
}
