//! Integration tests: utest-harness CLI over real run artefacts.
//!
//! Validates:
//! 1. Results files written by `run_main` summarize and validate.
//! 2. Failing results make `summarize` exit non-zero.
//! 3. Event logs written through UTEST_LOG pass `validate-log`; corrupt ones fail.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use utest::{Registry, RunConfig, SuiteBuilder, check, run_main};

fn harness(args: &[&str], path: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_utest-harness"))
        .args(args)
        .arg(path)
        .output()
        .expect("utest-harness should execute")
}

/// Run a two-proof suite, one passing and `failing` failing checks in the other.
fn produce_artefacts(dir: &Path, failing: usize) -> (PathBuf, PathBuf) {
    let results = dir.join("results.json");
    let log = dir.join("run.jsonl");
    let registry = Registry::new();
    registry
        .register_suite("Cli", move |suite: &mut SuiteBuilder<'_>| {
            suite.ensure("passes", |fx| {
                check!(fx, true);
                Ok(())
            });
            suite.ensure("maybe fails", move |fx| {
                for _ in 0..failing {
                    check!(fx, 1 > 2);
                }
                Ok(())
            });
        })
        .expect("register");

    let config = RunConfig {
        quiet: true,
        results_file: Some(results.clone()),
        event_log: Some(log.clone()),
        ..RunConfig::default()
    };
    run_main(&registry, &config, &mut Vec::new(), &mut Vec::new());
    (results, log)
}

#[test]
fn summarize_passing_results() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (results, _) = produce_artefacts(dir.path(), 0);

    let output = harness(&["summarize", "--results"], &results);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Result: OK\npassed: 2\n"), "{stdout}");
}

#[test]
fn summarize_failing_results_exits_non_zero() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (results, _) = produce_artefacts(dir.path(), 2);

    let output = harness(&["summarize", "--json", "--results"], &results);
    assert!(!output.status.success());
    let summary: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("summary should be JSON");
    assert_eq!(summary["total"], 3);
    assert_eq!(summary["passed"], 1);
    assert_eq!(summary["failed"], 2);
    assert_eq!(summary["failed_proofs"], serde_json::json!(["Cli::maybe fails"]));
}

#[test]
fn validate_results_rejects_malformed_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (results, _) = produce_artefacts(dir.path(), 1);
    assert!(harness(&["validate-results", "--results"], &results).status.success());

    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, r#"[{"type": "unittest", "name": "no separator", "passed": 1}]"#)
        .expect("write bad results");
    let output = harness(&["validate-results", "--results"], &bad);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("is not of the form <suite>::<proof>"), "{stderr}");
}

#[test]
fn validate_log_accepts_run_logs_and_rejects_corruption() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (_, log) = produce_artefacts(dir.path(), 1);
    assert!(harness(&["validate-log", "--log"], &log).status.success());

    let mut text = std::fs::read_to_string(&log).expect("read log");
    text.push_str("{\"timestamp\":\"t\",\"level\":\"loud\",\"event\":\"proof_result\"}\n");
    std::fs::write(&log, text).expect("append corrupt line");

    let output = harness(&["validate-log", "--log"], &log);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("field 'trace_id'"), "{stderr}");
    assert!(stderr.contains("invalid level: 'loud'"), "{stderr}");
}
