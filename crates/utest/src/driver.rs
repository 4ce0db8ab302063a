//! Process entry point: bind, run, report.

use std::io::Write;
use std::process::ExitCode;

use crate::config::RunConfig;
use crate::registry::{Phase, Registry};
use crate::report::{Report, ReportError, write_uncaught};
use crate::runner::{RunError, Runner};
use crate::structured_log::{LogEmitter, new_run_id};

/// Exit status of a clean run.
pub const EXIT_OK: i32 = 0;
/// Exit status for failed proofs, uncaught errors and reporting failures.
pub const EXIT_FAILED: i32 = 1;

/// Run every suite declared with [`model!`](crate::model) under the
/// configuration found in the environment.
///
/// Meant as the whole body of a test binary's `main`:
///
/// ```no_run
/// fn main() -> std::process::ExitCode {
///     utest::main()
/// }
/// ```
pub fn main() -> ExitCode {
    let code = match RunConfig::from_env() {
        Ok(config) => run_main(
            Registry::global(),
            &config,
            &mut std::io::stdout().lock(),
            &mut std::io::stderr().lock(),
        ),
        Err(err) => {
            eprintln!("utest: {err}");
            EXIT_FAILED
        }
    };
    if code == EXIT_OK {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Bind `registry` if needed, run it under `config` and report to `out` /
/// `err`. Returns the process exit status.
pub fn run_main(
    registry: &Registry,
    config: &RunConfig,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> i32 {
    if registry.phase() == Phase::Registering
        && let Err(e) = registry.bind()
    {
        let _ = writeln!(err, "utest: {e}");
        return EXIT_FAILED;
    }

    let mut runner = Runner::new(config.clone());
    if let Some(path) = &config.event_log {
        match LogEmitter::to_file(path, &new_run_id()) {
            Ok(emitter) => runner = runner.with_event_log(emitter),
            Err(e) => {
                let _ = writeln!(err, "utest: cannot open event log {}: {e}", path.display());
                return EXIT_FAILED;
            }
        }
    }

    match runner.run(registry, out) {
        Ok(_) => {}
        Err(RunError::UncaughtProof { proof, message }) => {
            let _ = write_uncaught(out, &proof, message.as_deref());
            return EXIT_FAILED;
        }
        Err(e) => {
            let _ = writeln!(err, "utest: {e}");
            return EXIT_FAILED;
        }
    }

    let report = Report::from_registry(registry);
    match write_report(&report, config, out, err) {
        Ok(()) if report.is_ok() => EXIT_OK,
        Ok(()) => EXIT_FAILED,
        Err(e) => {
            let _ = writeln!(out, "\nINTERNAL FAILURE");
            let _ = writeln!(err, "utest: {e}");
            EXIT_FAILED
        }
    }
}

fn write_report(
    report: &Report,
    config: &RunConfig,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<(), ReportError> {
    report.write_summary(out, err)?;
    if let Some(path) = &config.results_file {
        writeln!(out, " - Writing results to: {}", path.display())?;
        report.write_results_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SuiteBuilder;

    #[test]
    fn unwritable_results_file_is_an_internal_failure() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new();
        registry
            .register_suite("S", |s: &mut SuiteBuilder<'_>| s.ensure("p", |_| Ok(())))
            .unwrap();
        let config = RunConfig {
            quiet: true,
            // A directory cannot be opened as a file.
            results_file: Some(dir.path().to_path_buf()),
            ..RunConfig::default()
        };
        let (mut out, mut err) = (Vec::new(), Vec::new());

        assert_eq!(run_main(&registry, &config, &mut out, &mut err), EXIT_FAILED);
        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("Result: OK\n - Writing results to: "));
        assert!(out.ends_with("\nINTERNAL FAILURE\n"));
    }

    #[test]
    fn already_bound_registry_is_run_as_is() {
        let registry = Registry::new();
        registry
            .register_suite("S", |s: &mut SuiteBuilder<'_>| s.ensure("p", |_| Ok(())))
            .unwrap();
        registry.bind().unwrap();
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let config = RunConfig::default();
        assert_eq!(run_main(&registry, &config, &mut out, &mut err), EXIT_OK);
        assert_eq!(String::from_utf8(out).unwrap(), "== S ==\n * p\nResult: OK\n");

        // A second run of the same registry is refused.
        let mut err = Vec::new();
        assert_eq!(run_main(&registry, &config, &mut Vec::new(), &mut err), EXIT_FAILED);
        assert!(String::from_utf8(err).unwrap().contains("already been run"));
    }
}
