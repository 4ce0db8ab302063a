//! Run configuration.
//!
//! Read once from the environment at run start:
//! - `SUITE`: regex selecting suites, matched as `.*<value>.*` against the
//!   whole suite name. Absent means every suite.
//! - `PROOF`: same, for proof names.
//! - `Q`: any value suppresses the `== suite ==` / ` * proof` progress lines.
//! - `RESULTS_FILE`: where to write the JSON results array.
//! - `UTEST_LOG`: where to write the structured JSONL event log.

use std::path::PathBuf;

use regex::Regex;
use thiserror::Error;

pub const SUITE_VAR: &str = "SUITE";
pub const PROOF_VAR: &str = "PROOF";
pub const QUIET_VAR: &str = "Q";
pub const RESULTS_FILE_VAR: &str = "RESULTS_FILE";
pub const EVENT_LOG_VAR: &str = "UTEST_LOG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {var} filter '{pattern}': {source}")]
    InvalidFilter {
        var: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Name filter built from an optional pattern.
#[derive(Debug, Clone)]
pub struct NameFilter {
    pattern: Option<String>,
    regex: Option<Regex>,
}

impl Default for NameFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl NameFilter {
    /// Matches every name.
    #[must_use]
    pub fn all() -> Self {
        Self {
            pattern: None,
            regex: None,
        }
    }

    /// Matches names for which `.*<pattern>.*` matches in full.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:.*{pattern}.*)$"))?;
        Ok(Self {
            pattern: Some(pattern.to_string()),
            regex: Some(regex),
        })
    }

    #[must_use]
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.regex.as_ref().is_none_or(|re| re.is_match(name))
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub suite_filter: NameFilter,
    pub proof_filter: NameFilter,
    /// Suppress progress lines.
    pub quiet: bool,
    pub results_file: Option<PathBuf>,
    pub event_log: Option<PathBuf>,
}

impl RunConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| {
            std::env::var_os(name).map(|value| value.to_string_lossy().into_owned())
        })
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let filter = |var: &'static str| -> Result<NameFilter, ConfigError> {
            match lookup(var) {
                None => Ok(NameFilter::all()),
                Some(pattern) => {
                    NameFilter::new(&pattern).map_err(|source| ConfigError::InvalidFilter {
                        var,
                        pattern,
                        source,
                    })
                }
            }
        };

        Ok(Self {
            suite_filter: filter(SUITE_VAR)?,
            proof_filter: filter(PROOF_VAR)?,
            quiet: lookup(QUIET_VAR).is_some(),
            results_file: lookup(RESULTS_FILE_VAR).map(PathBuf::from),
            event_log: lookup(EVENT_LOG_VAR).map(PathBuf::from),
        })
    }
}

/// Value of an environment variable, or an empty string when unset.
#[must_use]
pub fn get_environment_variable(name: &str) -> String {
    std::env::var_os(name)
        .map(|value| value.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<RunConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        RunConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_match_everything() {
        let cfg = config(&[]).unwrap();
        assert!(cfg.suite_filter.matches("anything"));
        assert!(cfg.proof_filter.matches(""));
        assert!(!cfg.quiet);
        assert!(cfg.results_file.is_none());
        assert!(cfg.event_log.is_none());
    }

    #[test]
    fn filters_are_wrapped_in_wildcards() {
        let cfg = config(&[("SUITE", "Foo"), ("PROOF", "^add")]).unwrap();
        assert!(cfg.suite_filter.matches("Foo"));
        assert!(cfg.suite_filter.matches("MyFooSuite"));
        assert!(!cfg.suite_filter.matches("Bar"));
        assert_eq!(cfg.suite_filter.pattern(), Some("Foo"));
        assert!(cfg.proof_filter.matches("adds numbers"));
        assert!(!cfg.proof_filter.matches("it adds"));
    }

    #[test]
    fn alternation_keeps_full_match_semantics() {
        let filter = NameFilter::new("a|b").unwrap();
        // `.*a|b.*` in full: ends with `a` or starts with `b`.
        assert!(filter.matches("xxa"));
        assert!(filter.matches("bxx"));
        assert!(!filter.matches("xax"));
    }

    #[test]
    fn quiet_and_paths_are_read() {
        let cfg = config(&[("Q", ""), ("RESULTS_FILE", "out.json"), ("UTEST_LOG", "log.jsonl")])
            .unwrap();
        assert!(cfg.quiet);
        assert_eq!(cfg.results_file, Some(PathBuf::from("out.json")));
        assert_eq!(cfg.event_log, Some(PathBuf::from("log.jsonl")));
    }

    #[test]
    fn invalid_filter_is_reported() {
        let err = config(&[("SUITE", "(")]).unwrap_err();
        assert!(err.to_string().starts_with("invalid SUITE filter '('"));
    }

    #[test]
    fn environment_helper_returns_empty_for_unset() {
        assert!(get_environment_variable("UTEST_SURELY_UNSET_VARIABLE_42").is_empty());
        assert!(!get_environment_variable("PATH").is_empty());
    }
}
