//! Self-registering unit-test framework.
//!
//! This crate provides:
//! - Models: suites declared with [`model!`] and collected at load time
//! - Deferred binding: suite bodies expand into fixtures once, before the run
//! - Fixtures: checks, timed retries, time marks and named sync points
//! - A sequential runner with `SUITE`/`PROOF` regex filters
//! - Reporting: console summary, JSON results file, JSONL event log
//!
//! A test binary declares its models and hands control to [`main`]:
//!
//! ```ignore
//! use utest::{check_eq, model};
//!
//! model!("Math", |suite| {
//!     suite.ensure("adds", |fx| {
//!         check_eq!(fx, 1 + 1, 2);
//!         Ok(())
//!     });
//! });
//!
//! fn main() -> std::process::ExitCode {
//!     utest::main()
//! }
//! ```

#![forbid(unsafe_code)]

pub mod compare;
pub mod config;
pub mod driver;
pub mod failure;
pub mod fixture;
mod macros;
pub mod registry;
pub mod rendezvous;
pub mod report;
pub mod runner;
pub mod structured_log;

pub use compare::{FLOAT_TOLERANCE, ProofEq};
pub use config::{ConfigError, NameFilter, RunConfig, get_environment_variable};
pub use driver::{main, run_main};
pub use failure::{FailureLog, FailureRecord, Location, PassList};
pub use fixture::{Fixture, ProofError, ProofResult, Reporting, UNSET_MARK};
pub use registry::{Given, Registry, RegistryError, SuiteBuilder, SuiteRegistration};
pub use rendezvous::{DEFAULT_WAIT_TIMEOUT, Rendezvous, RendezvousError};
pub use report::{Report, ReportError, ResultEntry};
pub use runner::{RunError, RunSummary, Runner};

#[doc(hidden)]
pub mod __private {
    pub use inventory;
}
