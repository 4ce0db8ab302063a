//! Suite registry and deferred binding.
//!
//! Registration happens in two phases:
//! 1. Load time: every [`model!`](crate::model) submits a [`SuiteRegistration`]
//!    (suite name + body constructor). Nothing is built yet.
//! 2. [`Registry::bind`]: each body constructor is invoked once with a
//!    [`SuiteBuilder`] for its suite; every `ensure` declaration creates one
//!    fixture and binds the proof body to it.
//!
//! Running happens strictly after binding. The phase machine rejects late
//! registration and a second bind, which would otherwise duplicate every
//! proof.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use thiserror::Error;

use crate::failure::{FailureLog, PassList};
use crate::fixture::{Fixture, ProofResult};

/// Body constructor of a suite.
pub type SuiteBody = fn(&mut SuiteBuilder<'_>);

type SharedSuiteBody = Arc<dyn Fn(&mut SuiteBuilder<'_>) + Send + Sync>;
type ProofBody = Box<dyn Fn(&Fixture) -> ProofResult + Send + Sync>;
type Hook<S> = Box<dyn FnMut(&Fixture, &mut S) -> ProofResult + Send>;

/// Load-time record submitted by [`model!`](crate::model).
///
/// The source position orders blocks that share a suite name; load-time
/// collection order is unspecified.
pub struct SuiteRegistration {
    pub name: &'static str,
    pub body: SuiteBody,
    pub file: &'static str,
    pub line: u32,
    pub column: u32,
}

impl std::fmt::Debug for SuiteRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuiteRegistration")
            .field("name", &self.name)
            .field("file", &self.file)
            .field("line", &self.line)
            .field("column", &self.column)
            .finish_non_exhaustive()
    }
}

impl SuiteRegistration {
    #[must_use]
    pub const fn new(name: &'static str, body: SuiteBody) -> Self {
        Self {
            name,
            body,
            file: "",
            line: 0,
            column: 0,
        }
    }

    /// Source position of the declaring block.
    #[must_use]
    pub const fn at(self, file: &'static str, line: u32, column: u32) -> Self {
        Self {
            file,
            line,
            column,
            ..self
        }
    }
}

inventory::collect!(SuiteRegistration);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("suite '{suite}' registered after binding")]
    LateRegistration { suite: String },
    #[error("suites are already bound")]
    AlreadyBound,
    #[error("suites must be bound before running")]
    NotBound,
    #[error("registry has already been run")]
    AlreadyRan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Registering,
    /// Body constructors are running.
    Binding,
    Bound,
    Ran,
}

/// Execution state of one proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofState {
    Pending,
    Running,
    Passed,
    Failed,
}

impl ProofState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Passed | Self::Failed)
    }

    const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running) | (Self::Running, Self::Passed | Self::Failed)
        )
    }
}

/// A bound proof: its fixture plus the setup/body/teardown closure.
pub struct Proof {
    fixture: Fixture,
    body: ProofBody,
    state: Mutex<ProofState>,
}

impl std::fmt::Debug for Proof {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proof")
            .field("suite", &self.fixture.suite_name())
            .field("proof", &self.fixture.proof_name())
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl Proof {
    #[must_use]
    pub fn suite_name(&self) -> &str {
        self.fixture.suite_name()
    }

    #[must_use]
    pub fn proof_name(&self) -> &str {
        self.fixture.proof_name()
    }

    #[must_use]
    pub fn fixture(&self) -> &Fixture {
        &self.fixture
    }

    #[must_use]
    pub fn state(&self) -> ProofState {
        *self.state.lock()
    }

    /// Move to `next`; returns false (and stays put) for an illegal transition.
    pub(crate) fn advance(&self, next: ProofState) -> bool {
        let mut state = self.state.lock();
        if state.can_advance_to(next) {
            *state = next;
            true
        } else {
            false
        }
    }

    pub(crate) fn execute(&self) -> ProofResult {
        (self.body)(&self.fixture)
    }
}

/// Caller-defined fixture state with optional setup/teardown callbacks.
///
/// Setup, body and teardown run in that order with no isolation: an error
/// from setup or from the body propagates and teardown is skipped.
pub struct Given<S> {
    state: S,
    set_up: Option<Hook<S>>,
    tear_down: Option<Hook<S>>,
}

impl<S: Default> Default for Given<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S> Given<S> {
    #[must_use]
    pub fn new(state: S) -> Self {
        Self {
            state,
            set_up: None,
            tear_down: None,
        }
    }

    #[must_use]
    pub fn set_up(
        mut self,
        hook: impl FnMut(&Fixture, &mut S) -> ProofResult + Send + 'static,
    ) -> Self {
        self.set_up = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn tear_down(
        mut self,
        hook: impl FnMut(&Fixture, &mut S) -> ProofResult + Send + 'static,
    ) -> Self {
        self.tear_down = Some(Box::new(hook));
        self
    }

    fn run(
        &mut self,
        fixture: &Fixture,
        body: &(dyn Fn(&Fixture, &mut S) -> ProofResult + Send + Sync),
    ) -> ProofResult {
        if let Some(set_up) = self.set_up.as_mut() {
            set_up(fixture, &mut self.state)?;
        }
        body(fixture, &mut self.state)?;
        if let Some(tear_down) = self.tear_down.as_mut() {
            tear_down(fixture, &mut self.state)?;
        }
        Ok(())
    }
}

/// Handle passed to a suite body constructor during binding.
///
/// Carries its suite name explicitly, so proofs always land in the suite
/// whose constructor declared them.
pub struct SuiteBuilder<'r> {
    suite_name: &'r str,
    failures: &'r Arc<FailureLog>,
    proofs: &'r mut Vec<Arc<Proof>>,
}

impl SuiteBuilder<'_> {
    #[must_use]
    pub fn suite_name(&self) -> &str {
        self.suite_name
    }

    fn fixture(&self, proof_name: &str) -> Fixture {
        Fixture::new(self.suite_name, proof_name, Arc::clone(self.failures))
    }

    /// Declare a proof on a plain fixture.
    pub fn ensure(
        &mut self,
        proof_name: &str,
        body: impl Fn(&Fixture) -> ProofResult + Send + Sync + 'static,
    ) {
        let fixture = self.fixture(proof_name);
        self.proofs.push(Arc::new(Proof {
            fixture,
            body: Box::new(body),
            state: Mutex::new(ProofState::Pending),
        }));
    }

    /// Declare a proof whose body also receives caller-defined state.
    pub fn ensure_given<S: Send + 'static>(
        &mut self,
        proof_name: &str,
        given: Given<S>,
        body: impl Fn(&Fixture, &mut S) -> ProofResult + Send + Sync + 'static,
    ) {
        let given = Mutex::new(given);
        self.ensure(proof_name, move |fixture| given.lock().run(fixture, &body));
    }
}

/// Suite and proof tables plus the run's failure log and pass list.
pub struct Registry {
    phase: Mutex<Phase>,
    suites: Mutex<BTreeMap<String, Vec<SharedSuiteBody>>>,
    proofs: Mutex<BTreeMap<String, Vec<Arc<Proof>>>>,
    failures: Arc<FailureLog>,
    passes: PassList,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            phase: Mutex::new(Phase::Registering),
            suites: Mutex::new(BTreeMap::new()),
            proofs: Mutex::new(BTreeMap::new()),
            failures: Arc::new(FailureLog::new()),
            passes: PassList::new(),
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("phase", &self.phase())
            .field("suites", &self.suite_names())
            .field("failures", &self.failures.len())
            .field("passes", &self.passes.len())
            .finish()
    }
}

impl Registry {
    /// Empty registry, not connected to load-time registrations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every suite submitted with [`model!`](crate::model).
    #[must_use]
    pub fn with_registered() -> Self {
        let registry = Self::new();
        registry.collect_registered();
        registry
    }

    /// Process-wide registry, populated from load-time registrations on
    /// first access.
    pub fn global() -> &'static Registry {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(Registry::with_registered)
    }

    /// Reset to an empty registering state and reload load-time registrations.
    pub fn init(&self) {
        self.reset();
        self.collect_registered();
    }

    /// Drop every suite, proof, failure and pass.
    pub fn reset(&self) {
        self.suites.lock().clear();
        self.proofs.lock().clear();
        self.failures.clear();
        self.passes.clear();
        *self.phase.lock() = Phase::Registering;
    }

    fn collect_registered(&self) {
        let mut registrations: Vec<&SuiteRegistration> =
            inventory::iter::<SuiteRegistration>.into_iter().collect();
        registrations.sort_by_key(|r| (r.file, r.line, r.column));

        let mut suites = self.suites.lock();
        for registration in registrations {
            suites
                .entry(registration.name.to_string())
                .or_default()
                .push(Arc::new(registration.body));
        }
    }

    /// Add a body constructor under `name`. Repeated names accumulate.
    pub fn register_suite(
        &self,
        name: &str,
        body: impl Fn(&mut SuiteBuilder<'_>) + Send + Sync + 'static,
    ) -> Result<(), RegistryError> {
        let phase = self.phase.lock();
        if *phase != Phase::Registering {
            return Err(RegistryError::LateRegistration {
                suite: name.to_string(),
            });
        }
        self.suites
            .lock()
            .entry(name.to_string())
            .or_default()
            .push(Arc::new(body));
        Ok(())
    }

    /// Invoke every body constructor once. Returns the number of proofs bound.
    ///
    /// Constructors run without the phase lock held; while they run the
    /// registry reports [`Phase::Binding`].
    pub fn bind(&self) -> Result<usize, RegistryError> {
        {
            let mut phase = self.phase.lock();
            if *phase != Phase::Registering {
                return Err(RegistryError::AlreadyBound);
            }
            *phase = Phase::Binding;
        }

        let suites: Vec<(String, Vec<SharedSuiteBody>)> = self
            .suites
            .lock()
            .iter()
            .map(|(name, bodies)| (name.clone(), bodies.clone()))
            .collect();

        let mut bound = 0;
        for (suite_name, bodies) in suites {
            if bodies.is_empty() {
                continue;
            }
            let mut proofs = Vec::new();
            for body in &bodies {
                let mut builder = SuiteBuilder {
                    suite_name: &suite_name,
                    failures: &self.failures,
                    proofs: &mut proofs,
                };
                body(&mut builder);
            }
            bound += proofs.len();
            self.proofs
                .lock()
                .entry(suite_name)
                .or_default()
                .extend(proofs);
        }

        *self.phase.lock() = Phase::Bound;
        Ok(bound)
    }

    /// Claim the bound proofs for a run.
    pub(crate) fn begin_run(&self) -> Result<(), RegistryError> {
        let mut phase = self.phase.lock();
        match *phase {
            Phase::Registering | Phase::Binding => Err(RegistryError::NotBound),
            Phase::Ran => Err(RegistryError::AlreadyRan),
            Phase::Bound => {
                *phase = Phase::Ran;
                Ok(())
            }
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        *self.phase.lock()
    }

    #[must_use]
    pub fn suite_count(&self) -> usize {
        self.suites.lock().len()
    }

    #[must_use]
    pub fn suite_names(&self) -> Vec<String> {
        self.suites.lock().keys().cloned().collect()
    }

    #[must_use]
    pub fn proof_count(&self) -> usize {
        self.proofs.lock().values().map(Vec::len).sum()
    }

    /// Bound proofs grouped by suite, suites in name order.
    #[must_use]
    pub fn proofs(&self) -> Vec<(String, Vec<Arc<Proof>>)> {
        self.proofs
            .lock()
            .iter()
            .map(|(name, proofs)| (name.clone(), proofs.clone()))
            .collect()
    }

    #[must_use]
    pub fn failures(&self) -> &Arc<FailureLog> {
        &self.failures
    }

    #[must_use]
    pub fn passes(&self) -> &PassList {
        &self.passes
    }
}
