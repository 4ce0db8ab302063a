//! CLI entrypoint for utest artefact tooling.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use utest_harness::{ResultsSummary, load_results, validate_log_file};

/// Inspect the files a utest run leaves behind.
#[derive(Debug, Parser)]
#[command(name = "utest-harness")]
#[command(about = "Summarize and validate utest results files and event logs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Summarize a results file; fails when it lists any failure.
    Summarize {
        /// Results JSON written through RESULTS_FILE.
        #[arg(long)]
        results: PathBuf,
        /// Print the summary as JSON instead of plain text.
        #[arg(long)]
        json: bool,
    },
    /// Check a results file against the results schema.
    ValidateResults {
        #[arg(long)]
        results: PathBuf,
    },
    /// Check a structured JSONL event log written through UTEST_LOG.
    ValidateLog {
        #[arg(long)]
        log: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Summarize { results, json } => {
            let entries = load_results(&results)?;
            let summary = ResultsSummary::from_entries(&entries);
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", summary.to_plain());
            }
            if !summary.is_ok() {
                return Err(format!(
                    "{} failure(s) in {} proof(s)",
                    summary.failed,
                    summary.failed_proofs.len()
                )
                .into());
            }
        }
        Command::ValidateResults { results } => {
            let entries = load_results(&results)?;
            eprintln!(
                "{}: {} entr{} valid",
                results.display(),
                entries.len(),
                if entries.len() == 1 { "y" } else { "ies" }
            );
        }
        Command::ValidateLog { log } => {
            let (lines, errors) = validate_log_file(&log)?;
            for error in &errors {
                eprintln!("{error}");
            }
            if !errors.is_empty() {
                return Err(format!(
                    "{}: {} violation(s) in {lines} line(s)",
                    log.display(),
                    errors.len()
                )
                .into());
            }
            eprintln!("{}: {lines} line(s) valid", log.display());
        }
    }

    Ok(())
}
