//! Sequential proof runner.

use std::any::Any;
use std::io::Write;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

use thiserror::Error;

use crate::config::RunConfig;
use crate::failure::proof_id;
use crate::registry::{Proof, ProofState, Registry, RegistryError};
use crate::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// An error or panic escaped a proof body. `message` is `None` when the
    /// error or panic payload carried no text.
    #[error("uncaught error in '{proof}': {}", .message.as_deref().unwrap_or("<unknown>"))]
    UncaughtProof {
        proof: String,
        message: Option<String>,
    },
    #[error("run output failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub suites: usize,
    pub executed: usize,
    pub passed: usize,
    pub failed: usize,
    /// Failure records appended during the run.
    pub failures: usize,
}

impl RunSummary {
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failures == 0
    }
}

/// Walks the bound proofs of a registry in suite order, applying the
/// configured filters.
#[derive(Debug)]
pub struct Runner {
    config: RunConfig,
    log: Option<LogEmitter>,
}

impl Runner {
    #[must_use]
    pub fn new(config: RunConfig) -> Self {
        Self { config, log: None }
    }

    #[must_use]
    pub fn with_event_log(mut self, emitter: LogEmitter) -> Self {
        self.log = Some(emitter);
        self
    }

    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Execute every selected proof once.
    ///
    /// Progress lines go to `out` unless quiet. The first error or panic
    /// escaping a body stops the run; no later proof executes.
    pub fn run(
        &mut self,
        registry: &Registry,
        out: &mut dyn Write,
    ) -> Result<RunSummary, RunError> {
        registry.begin_run()?;
        let run_started = Instant::now();
        let details = serde_json::json!({
            "suite_filter": self.config.suite_filter.pattern(),
            "proof_filter": self.config.proof_filter.pattern(),
            "proofs": registry.proof_count(),
        });
        self.log_event(LogLevel::Info, "run_start", |entry| entry.with_details(details))?;

        let failures_before = registry.failures().len();
        let mut summary = RunSummary::default();

        for (suite_name, proofs) in registry.proofs() {
            if !self.config.suite_filter.matches(&suite_name) {
                continue;
            }
            summary.suites += 1;
            if !self.config.quiet {
                writeln!(out, "== {suite_name} ==")?;
            }
            for proof in proofs {
                if !self.config.proof_filter.matches(proof.proof_name()) {
                    continue;
                }
                if !self.config.quiet {
                    writeln!(out, " * {}", proof.proof_name())?;
                    out.flush()?;
                }
                match self.run_proof(registry, &proof)? {
                    ProofState::Passed => summary.passed += 1,
                    _ => summary.failed += 1,
                }
                summary.executed += 1;
            }
        }

        summary.failures = registry.failures().len() - failures_before;
        let elapsed = millis(run_started);
        self.log_event(LogLevel::Info, "run_end", |entry| {
            entry
                .with_failure_count(summary.failures)
                .with_exit_code(i32::from(!summary.all_passed()))
                .with_duration_ms(elapsed)
                .with_details(serde_json::json!({
                    "executed": summary.executed,
                    "passed": summary.passed,
                    "failed": summary.failed,
                }))
        })?;
        self.flush_log()?;
        Ok(summary)
    }

    fn run_proof(&mut self, registry: &Registry, proof: &Proof) -> Result<ProofState, RunError> {
        let (suite, name) = (proof.suite_name(), proof.proof_name());
        self.log_event(LogLevel::Debug, "proof_start", |entry| {
            entry.with_proof(suite, name)
        })?;

        proof.advance(ProofState::Running);
        let before = registry.failures().len();
        let started = Instant::now();

        let escaped = match catch_unwind(AssertUnwindSafe(|| proof.execute())) {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(Some(err.to_string()).filter(|m| !m.is_empty())),
            Err(payload) => Some(panic_message(payload.as_ref())),
        };

        if let Some(message) = escaped {
            proof.advance(ProofState::Failed);
            self.log_event(LogLevel::Error, "proof_uncaught", |entry| {
                let entry = entry
                    .with_proof(suite, name)
                    .with_outcome(Outcome::Error)
                    .with_duration_ms(millis(started));
                match &message {
                    Some(text) => entry.with_details(serde_json::json!({ "message": text })),
                    None => entry,
                }
            })?;
            self.log_event(LogLevel::Error, "run_end", |entry| entry.with_exit_code(1))?;
            self.flush_log()?;
            return Err(RunError::UncaughtProof {
                proof: proof_id(suite, name),
                message,
            });
        }

        let recorded = registry.failures().len() - before;
        let state = if recorded == 0 {
            registry.passes().record(suite, name);
            ProofState::Passed
        } else {
            ProofState::Failed
        };
        proof.advance(state);

        let (level, outcome) = match state {
            ProofState::Passed => (LogLevel::Info, Outcome::Pass),
            _ => (LogLevel::Warn, Outcome::Fail),
        };
        self.log_event(level, "proof_result", |entry| {
            entry
                .with_proof(suite, name)
                .with_outcome(outcome)
                .with_failure_count(recorded)
                .with_duration_ms(millis(started))
        })?;
        Ok(state)
    }

    fn log_event(
        &mut self,
        level: LogLevel,
        event: &str,
        fill: impl FnOnce(LogEntry) -> LogEntry,
    ) -> Result<(), RunError> {
        if let Some(log) = self.log.as_mut() {
            let entry = fill(log.entry(level, event));
            log.emit_entry(entry)?;
        }
        Ok(())
    }

    fn flush_log(&mut self) -> Result<(), RunError> {
        if let Some(log) = self.log.as_mut() {
            log.flush()?;
        }
        Ok(())
    }
}

fn millis(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Text of a panic payload, when it carries any.
fn panic_message(payload: &(dyn Any + Send)) -> Option<String> {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NameFilter;
    use crate::registry::SuiteBuilder;
    use crate::structured_log::validate_log_line;
    use std::sync::{Arc, Mutex};

    fn registry() -> Registry {
        let registry = Registry::new();
        registry
            .register_suite("Foo", |s: &mut SuiteBuilder<'_>| {
                s.ensure("passes", |_| Ok(()));
                s.ensure("fails", |fx| {
                    fx.add_failure(crate::Location::new("t.rs", 7), "x", "1", "2", "x");
                    Ok(())
                });
            })
            .unwrap();
        registry
            .register_suite("Bar", |s: &mut SuiteBuilder<'_>| s.ensure("passes", |_| Ok(())))
            .unwrap();
        registry.bind().unwrap();
        registry
    }

    #[test]
    fn run_prints_progress_and_tracks_outcomes() {
        let registry = registry();
        let mut out = Vec::new();
        let summary = Runner::new(RunConfig::default())
            .run(&registry, &mut out)
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "== Bar ==\n * passes\n== Foo ==\n * passes\n * fails\n"
        );
        assert_eq!(summary.executed, 3);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures, 1);
        assert_eq!(registry.passes().snapshot(), vec!["Bar::passes", "Foo::passes"]);

        let foo = &registry.proofs()[1].1;
        assert_eq!(foo[0].state(), ProofState::Passed);
        assert_eq!(foo[1].state(), ProofState::Failed);
    }

    #[test]
    fn filters_and_quiet_mode() {
        let registry = registry();
        let config = RunConfig {
            suite_filter: NameFilter::new("Fo").unwrap(),
            proof_filter: NameFilter::new("pass").unwrap(),
            quiet: true,
            ..RunConfig::default()
        };
        let mut out = Vec::new();
        let summary = Runner::new(config).run(&registry, &mut out).unwrap();

        assert!(out.is_empty());
        assert_eq!(summary.suites, 1);
        assert_eq!(summary.executed, 1);
        assert!(summary.all_passed());
        assert_eq!(registry.proofs()[0].1[0].state(), ProofState::Pending);
    }

    #[test]
    fn escaping_error_stops_the_run() {
        let registry = Registry::new();
        registry
            .register_suite("Stop", |s: &mut SuiteBuilder<'_>| {
                s.ensure("a_throws", |_| Err("bang".into()));
                s.ensure("b_never_runs", |_| panic!("must not execute"));
            })
            .unwrap();
        registry.bind().unwrap();

        let err = Runner::new(RunConfig::default())
            .run(&registry, &mut Vec::new())
            .unwrap_err();
        match err {
            RunError::UncaughtProof { proof, message } => {
                assert_eq!(proof, "Stop::a_throws");
                assert_eq!(message.as_deref(), Some("bang"));
            }
            other => panic!("unexpected error: {other}"),
        }
        let proofs = &registry.proofs()[0].1;
        assert_eq!(proofs[0].state(), ProofState::Failed);
        assert_eq!(proofs[1].state(), ProofState::Pending);
    }

    #[test]
    fn escaping_panic_is_uncaught() {
        let registry = Registry::new();
        registry
            .register_suite("Panics", |s: &mut SuiteBuilder<'_>| {
                s.ensure("boom", |_| panic!("kaboom"));
            })
            .unwrap();
        registry.bind().unwrap();

        let err = Runner::new(RunConfig::default())
            .run(&registry, &mut Vec::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "uncaught error in 'Panics::boom': kaboom");
    }

    #[test]
    fn run_requires_bound_registry_and_runs_once() {
        let registry = Registry::new();
        let mut runner = Runner::new(RunConfig::default());
        assert!(matches!(
            runner.run(&registry, &mut Vec::new()),
            Err(RunError::Registry(RegistryError::NotBound))
        ));
        registry.bind().unwrap();
        runner.run(&registry, &mut Vec::new()).unwrap();
        assert!(matches!(
            runner.run(&registry, &mut Vec::new()),
            Err(RunError::Registry(RegistryError::AlreadyRan))
        ));
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn event_log_records_each_proof() {
        let registry = registry();
        let buf = SharedBuf::default();
        let mut runner = Runner::new(RunConfig::default())
            .with_event_log(LogEmitter::to_writer(buf.clone(), "unit"));
        runner.run(&registry, &mut Vec::new()).unwrap();

        let bytes = buf.0.lock().unwrap().clone();
        let text = String::from_utf8(bytes).unwrap();
        let events: Vec<String> = text
            .lines()
            .enumerate()
            .map(|(i, line)| validate_log_line(line, i + 1).expect("valid line").event)
            .collect();
        assert_eq!(events.first().map(String::as_str), Some("run_start"));
        assert_eq!(events.last().map(String::as_str), Some("run_end"));
        assert_eq!(events.iter().filter(|e| *e == "proof_result").count(), 3);
        assert!(text.contains("\"outcome\":\"fail\""));
    }
}
