//! This module contains the symbolic executor, which drives the search over the
//! execution paths of a program.
//!
//! # The Search Loop
//!
//! There is only ever one current state. On every iteration of the loop, the
//! executor does exactly one of the following:
//!
//! - If the current state is terminal, it hands the state to the completion
//!   callback, records the coverage of the path, and backtracks.
//! - Otherwise, it asks the [`Stepper`] for the successors of the current state
//!   and asks the [`SelectionPolicy`] to pick one of them. If the stepper gives
//!   up on the state, or the policy picks nothing, it backtracks.
//!
//! Backtracking asks the policy to resume one of the branches it passed over
//! earlier. When there are none left, the search is over.

pub mod policy;

use std::{
    fmt::{Display, Formatter},
    time::Duration,
};

use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

pub use self::policy::{ExplorationStrategy, PolicyContext, SelectionPolicy};
use crate::{
    constant::{
        DEFAULT_MAX_STEPS_WITHOUT_TEST,
        DEFAULT_MAX_TESTS,
        DEFAULT_STOP_ON_FULL_COVERAGE,
        DEFAULT_STRICT_MODE_ENABLED,
    },
    coverage::{CoverageReport, CoverageTracker},
    error::{
        self,
        container::Locatable,
        execution::{self as execution_error, Error},
    },
    executor::policy::ReplayMismatch,
    interface::{Solver, Stepper},
    state::{ExecutionState, StateRef},
    watchdog::DynWatchdog,
};

/// The driver of the path search.
///
/// It owns the collaborators that give the program its semantics and decide
/// feasibility, along with the active selection policy. The global coverage is
/// passed in to every run so that it can be shared between executors and
/// inspected by the caller.
#[derive(Debug)]
pub struct SymbolicExecutor<St, So> {
    /// The interpreter that produces the successors of each state.
    stepper: St,

    /// The solver used to check the feasibility of branches.
    solver: So,

    /// The policy choosing which branch to follow, along with its backlog.
    policy: SelectionPolicy,

    /// The configuration of the search.
    config: Config,

    /// The source of every random decision made by the policy.
    rng: StdRng,

    /// Counters accumulated over every run of this executor.
    stats: SearchStats,

    /// A watchdog that gets polled at intervals to check whether the search
    /// needs to exit.
    watchdog: DynWatchdog,
}

impl<St, So> SymbolicExecutor<St, So>
where
    St: Stepper,
    So: Solver,
{
    /// Constructs a new executor that searches using the provided `policy`.
    ///
    /// If the `config` provides no seed, the random number generator is seeded
    /// from system entropy.
    #[must_use]
    pub fn new(
        stepper: St,
        solver: So,
        policy: SelectionPolicy,
        config: Config,
        watchdog: DynWatchdog,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let stats = SearchStats::default();

        Self {
            stepper,
            solver,
            policy,
            config,
            rng,
            stats,
            watchdog,
        }
    }

    /// Searches the paths of the program starting from `root`, handing every
    /// terminal state reached to `on_terminal`.
    ///
    /// The callback returns `true` to stop the search. The points visited by
    /// every terminal state are merged into `coverage` once the callback has
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the stepper meets an unimplemented feature while in
    /// strict mode, or if the watchdog asks for the search to stop. Per-path
    /// failures outside strict mode are reported in the returned summary
    /// instead.
    pub fn run<F>(
        &mut self,
        root: impl Into<StateRef>,
        coverage: &mut CoverageTracker,
        mut on_terminal: F,
    ) -> error::Result<RunSummary>
    where
        F: FnMut(&ExecutionState) -> bool,
    {
        let root = root.into();
        info!(policy = self.policy.name(), root = %root.id(), "Starting search");
        self.search(Some(root), coverage, &mut on_terminal)
    }

    /// Continues the search from the branches the policy passed over during
    /// previous runs, such as after a run stopped by reaching the test limit.
    ///
    /// The test limit applies afresh to every continuation.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] under the same conditions as [`Self::run`].
    pub fn continue_run<F>(
        &mut self,
        coverage: &mut CoverageTracker,
        mut on_terminal: F,
    ) -> error::Result<RunSummary>
    where
        F: FnMut(&ExecutionState) -> bool,
    {
        info!(
            policy = self.policy.name(),
            backlog = self.policy.backlog_len(),
            "Continuing search"
        );
        self.search(None, coverage, &mut on_terminal)
    }

    /// Gets the counters accumulated over every run of this executor.
    #[must_use]
    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    /// Gets the active selection policy.
    #[must_use]
    pub fn policy(&self) -> &SelectionPolicy {
        &self.policy
    }

    /// Gets the configuration of the executor.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Gets the stepper.
    #[must_use]
    pub fn stepper(&self) -> &St {
        &self.stepper
    }

    /// Gets the solver.
    #[must_use]
    pub fn solver(&self) -> &So {
        &self.solver
    }

    /// Runs the search loop starting from `current`, or from the backlog if
    /// there is no current state.
    fn search(
        &mut self,
        mut current: Option<StateRef>,
        coverage: &mut CoverageTracker,
        on_terminal: &mut dyn FnMut(&ExecutionState) -> bool,
    ) -> error::Result<RunSummary> {
        let poll_interval = self.watchdog.poll_every().max(1);
        let mut iterations: usize = 0;
        let mut tests_produced = 0;
        let mut errors = execution_error::Errors::new();

        loop {
            // If we have been told to stop, stop and return an error.
            if iterations % poll_interval == 0 && self.watchdog.should_stop() {
                let location = current.as_ref().and_then(|state| state.location());
                warn!(?location, "Search stopped by the watchdog");
                return Err(Error::StoppedByWatchdog.locate(location).into());
            }
            iterations = iterations.wrapping_add(1);

            let state = match current.take() {
                Some(state) => state,
                None => match self.backtrack(coverage) {
                    Some(state) => state,
                    None => {
                        let reason = match self.policy.replay_mismatch() {
                            Some(mismatch) => StopReason::ReplayMismatch(mismatch.clone()),
                            None => StopReason::Exhausted,
                        };
                        return Ok(self.summarize(reason, tests_produced, errors, coverage));
                    }
                },
            };

            if state.is_terminal() {
                let stop = on_terminal(&state);
                tests_produced += 1;
                self.stats.tests_produced += 1;
                if coverage.mark(state.visited()) {
                    self.stats.coverage_increasing_tests += 1;
                }
                self.policy.notify_terminal();
                debug!(state = %state.id(), script = %state.replay_script(), "Reached terminal state");

                let reason = if stop {
                    Some(StopReason::CallbackRequestedStop)
                } else if self.config.max_tests != 0 && tests_produced >= self.config.max_tests {
                    Some(StopReason::MaxTestsReached)
                } else if self.config.stop_on_full_coverage && coverage.is_complete() {
                    Some(StopReason::FullCoverage)
                } else {
                    None
                };
                if let Some(reason) = reason {
                    return Ok(self.summarize(reason, tests_produced, errors, coverage));
                }

                continue;
            }

            self.stats.steps += 1;
            match self.stepper.step(&state) {
                Ok(batch) if batch.is_empty() => {
                    self.stats.dead_ends += 1;
                    debug!(location = ?state.location(), "Stepper produced no successors");
                }
                Ok(batch) => {
                    let mut context = PolicyContext::new(
                        &mut self.solver,
                        coverage,
                        &mut self.rng,
                        &mut self.stats,
                        self.config.solver_timeout,
                        self.config.max_steps_without_test,
                    );
                    current = self.policy.pick(batch, &mut context);

                    if current.is_none() {
                        if let Some(mismatch) = self.policy.replay_mismatch() {
                            let reason = StopReason::ReplayMismatch(mismatch.clone());
                            return Ok(self.summarize(reason, tests_produced, errors, coverage));
                        }
                        self.stats.dead_ends += 1;
                        debug!(location = ?state.location(), "No feasible successor");
                    }
                }
                Err(unimplemented) => {
                    self.stats.unimplemented_paths += 1;
                    let mut error = execution_error::LocatedError::from(unimplemented);
                    if error.location.is_none() {
                        error.location = state.location();
                    }

                    if self.config.strict {
                        return Err(error.into());
                    }
                    warn!(%error, "Abandoning path");
                    errors.add_located(error.location, error.payload);
                }
            }
        }
    }

    /// Asks the policy for a passed-over branch to continue from.
    fn backtrack(&mut self, coverage: &CoverageTracker) -> Option<StateRef> {
        self.stats.backtracks += 1;
        debug!(backlog = self.policy.backlog_len(), "Backtracking");

        let mut context = PolicyContext::new(
            &mut self.solver,
            coverage,
            &mut self.rng,
            &mut self.stats,
            self.config.solver_timeout,
            self.config.max_steps_without_test,
        );
        self.policy.resume(&mut context)
    }

    fn summarize(
        &self,
        stop_reason: StopReason,
        tests_produced: usize,
        errors: execution_error::Errors,
        coverage: &CoverageTracker,
    ) -> RunSummary {
        let summary = RunSummary {
            stop_reason,
            tests_produced,
            coverage: coverage.report(),
            stats: self.stats.clone(),
            errors: errors.into(),
        };
        info!(
            reason = %summary.stop_reason,
            tests = summary.tests_produced,
            coverage = %summary.coverage,
            "Search finished"
        );
        if !summary.errors.is_empty() {
            warn!(errors = %summary.errors, "Paths were abandoned during the search");
        }

        summary
    }
}

/// The configuration for the symbolic executor.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// The maximum number of terminal states that a single run hands to the
    /// completion callback. Zero means there is no limit.
    ///
    /// Defaults to [`DEFAULT_MAX_TESTS`].
    pub max_tests: usize,

    /// Whether an unimplemented feature aborts the whole run rather than just
    /// the path that met it.
    ///
    /// Defaults to [`DEFAULT_STRICT_MODE_ENABLED`].
    pub strict: bool,

    /// The seed for every random decision made during the search. If this is
    /// [`None`], the generator is seeded from system entropy.
    pub seed: Option<u64>,

    /// The number of multi-way branching steps the greedy policies may take
    /// without producing a test before they fall back to random choice.
    ///
    /// Defaults to [`DEFAULT_MAX_STEPS_WITHOUT_TEST`].
    pub max_steps_without_test: usize,

    /// The time limit passed to every solver call, if any.
    pub solver_timeout: Option<Duration>,

    /// Whether to stop as soon as every point in the coverage tracker's
    /// universe has been covered.
    ///
    /// Defaults to [`DEFAULT_STOP_ON_FULL_COVERAGE`].
    pub stop_on_full_coverage: bool,
}

impl Config {
    /// Sets the `max_tests` config parameter to `value`.
    #[must_use]
    pub fn with_max_tests(mut self, value: usize) -> Self {
        self.max_tests = value;
        self
    }

    /// Sets the strict mode config parameter to `value`.
    #[must_use]
    pub fn with_strict(mut self, value: bool) -> Self {
        self.strict = value;
        self
    }

    /// Sets the random seed to `value`.
    #[must_use]
    pub fn with_seed(mut self, value: u64) -> Self {
        self.seed = Some(value);
        self
    }

    /// Sets the `max_steps_without_test` config parameter to `value`.
    #[must_use]
    pub fn with_max_steps_without_test(mut self, value: usize) -> Self {
        self.max_steps_without_test = value;
        self
    }

    /// Sets the solver time limit to `value`.
    #[must_use]
    pub fn with_solver_timeout(mut self, value: Duration) -> Self {
        self.solver_timeout = Some(value);
        self
    }

    /// Sets the `stop_on_full_coverage` config parameter to `value`.
    #[must_use]
    pub fn with_stop_on_full_coverage(mut self, value: bool) -> Self {
        self.stop_on_full_coverage = value;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        let max_tests = DEFAULT_MAX_TESTS;
        let strict = DEFAULT_STRICT_MODE_ENABLED;
        let seed = None;
        let max_steps_without_test = DEFAULT_MAX_STEPS_WITHOUT_TEST;
        let solver_timeout = None;
        let stop_on_full_coverage = DEFAULT_STOP_ON_FULL_COVERAGE;
        Self {
            max_tests,
            strict,
            seed,
            max_steps_without_test,
            solver_timeout,
            stop_on_full_coverage,
        }
    }
}

/// Counters describing the work done by an executor.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct SearchStats {
    /// Calls made to the stepper.
    pub steps: usize,

    /// Calls made to the solver.
    pub solver_calls: usize,

    /// Branches dropped because the solver did not find them satisfiable.
    pub discarded_branches: usize,

    /// Times the policy was asked to resume from its backlog.
    pub backtracks: usize,

    /// Non-terminal states from which no feasible successor was found.
    pub dead_ends: usize,

    /// Paths abandoned because the stepper met an unimplemented feature.
    pub unimplemented_paths: usize,

    /// Terminal states handed to the completion callback.
    pub tests_produced: usize,

    /// Terminal states that covered at least one new program point.
    pub coverage_increasing_tests: usize,
}

/// The reason that a run ended.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum StopReason {
    /// The completion callback asked for the search to stop.
    CallbackRequestedStop,

    /// The run produced as many tests as it was allowed to.
    MaxTestsReached,

    /// Every point in the coverage universe has been covered.
    FullCoverage,

    /// There are no branches left to explore.
    Exhausted,

    /// The replay policy could not follow its script.
    ReplayMismatch(ReplayMismatch),
}

impl Display for StopReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CallbackRequestedStop => write!(f, "stopped by callback"),
            Self::MaxTestsReached => write!(f, "test limit reached"),
            Self::FullCoverage => write!(f, "full coverage"),
            Self::Exhausted => write!(f, "search space exhausted"),
            Self::ReplayMismatch(mismatch) => write!(f, "replay mismatch: {mismatch}"),
        }
    }
}

/// The outcome of a single call to [`SymbolicExecutor::run`] or
/// [`SymbolicExecutor::continue_run`].
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    /// Why the run ended.
    pub stop_reason: StopReason,

    /// The number of terminal states handed to the callback during this run.
    pub tests_produced: usize,

    /// The global coverage at the end of the run.
    pub coverage: CoverageReport,

    /// The executor's counters at the end of the run, accumulated over every
    /// run of the executor.
    pub stats: SearchStats,

    /// The per-path failures that were recovered from during this run, in
    /// program point order.
    pub errors: error::Errors,
}

impl RunSummary {
    /// Checks if the run produced no tests at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tests_produced == 0
    }
}

#[cfg(test)]
mod test {
    use std::sync::{atomic::AtomicBool, Arc};

    use crate::{
        branch::Branch,
        coverage::{CoverageTracker, ProgramPoint},
        error,
        executor::{
            policy::{test_util::CountingSolver, SelectionPolicy},
            Config,
            StopReason,
            SymbolicExecutor,
        },
        interface::{StepResult, Unimplemented},
        state::{expression::Expr, ExecutionState},
        watchdog::{FlagWatchdog, LazyWatchdog},
    };

    /// A program that branches once at statement 0 and rejoins at statement 3.
    fn diamond(state: &ExecutionState) -> StepResult {
        let branches = match state.location().map(|point| point.id()) {
            Some(0) => {
                let guard = Expr::var("x").less_than(Expr::Int(5));
                let negated = Expr::not(guard.clone());
                vec![
                    Branch::guarded(
                        guard.clone(),
                        state.successor().at(ProgramPoint::statement(1)).assume(guard).finish(),
                    ),
                    Branch::guarded(
                        negated.clone(),
                        state.successor().at(ProgramPoint::statement(2)).assume(negated).finish(),
                    ),
                ]
            }
            Some(1 | 2) => vec![Branch::new(
                state
                    .successor()
                    .at(ProgramPoint::statement(3))
                    .terminate()
                    .finish(),
            )],
            other => return Err(Unimplemented::new(format!("no statement {other:?}"))),
        };

        Ok(branches)
    }

    fn root() -> ExecutionState {
        ExecutionState::new_at(ProgramPoint::statement(0))
    }

    fn executor(
        config: Config,
    ) -> SymbolicExecutor<fn(&ExecutionState) -> StepResult, CountingSolver> {
        SymbolicExecutor::new(
            diamond as fn(&ExecutionState) -> StepResult,
            CountingSolver::default(),
            SelectionPolicy::depth_first(),
            config.with_seed(17),
            LazyWatchdog.in_rc(),
        )
    }

    #[test]
    fn explores_both_sides_of_a_branch() -> anyhow::Result<()> {
        let mut executor = executor(Config::default());
        let mut coverage = CoverageTracker::new();
        let mut scripts = Vec::new();

        let summary = executor.run(root(), &mut coverage, |state| {
            scripts.push(state.replay_script());
            false
        })?;

        scripts.sort();
        assert_eq!(scripts, vec!["1", "2"]);
        assert_eq!(summary.stop_reason, StopReason::Exhausted);
        assert_eq!(summary.tests_produced, 2);
        assert_eq!(summary.stats.steps, 3);
        assert_eq!(summary.stats.solver_calls, 2);
        assert_eq!(executor.solver().calls, 2);
        assert_eq!(coverage.len(), 3);
        assert!(summary.errors.is_empty());

        Ok(())
    }

    #[test]
    fn callback_can_stop_the_search() -> anyhow::Result<()> {
        let mut executor = executor(Config::default());
        let mut coverage = CoverageTracker::new();

        let summary = executor.run(root(), &mut coverage, |_| true)?;
        assert_eq!(summary.stop_reason, StopReason::CallbackRequestedStop);
        assert_eq!(summary.tests_produced, 1);
        assert_eq!(executor.policy().backlog_len(), 1);

        // Coverage is still recorded for the test that stopped the search.
        assert_eq!(coverage.len(), 2);

        Ok(())
    }

    #[test]
    fn test_limit_applies_per_invocation() -> anyhow::Result<()> {
        let mut executor = executor(Config::default().with_max_tests(1));
        let mut coverage = CoverageTracker::new();

        let first = executor.run(root(), &mut coverage, |_| false)?;
        assert_eq!(first.stop_reason, StopReason::MaxTestsReached);

        let second = executor.continue_run(&mut coverage, |_| false)?;
        assert_eq!(second.stop_reason, StopReason::MaxTestsReached);
        assert_eq!(second.tests_produced, 1);
        assert_eq!(second.stats.tests_produced, 2);

        let third = executor.continue_run(&mut coverage, |_| false)?;
        assert_eq!(third.stop_reason, StopReason::Exhausted);
        assert!(third.is_empty());

        Ok(())
    }

    #[test]
    fn stops_once_the_universe_is_covered() -> anyhow::Result<()> {
        let mut executor = executor(Config::default().with_stop_on_full_coverage(true));
        let mut coverage =
            CoverageTracker::with_universe([ProgramPoint::statement(1), ProgramPoint::statement(3)]);

        let summary = executor.run(root(), &mut coverage, |_| false)?;
        assert_eq!(summary.stop_reason, StopReason::FullCoverage);
        assert!(coverage.is_complete());
        assert!(summary.coverage.uncovered.is_empty());

        Ok(())
    }

    #[test]
    fn an_empty_universe_never_counts_as_covered() -> anyhow::Result<()> {
        let mut executor = executor(Config::default().with_stop_on_full_coverage(true));
        let mut coverage = CoverageTracker::with_universe([]);

        let summary = executor.run(root(), &mut coverage, |_| false)?;
        assert_eq!(summary.stop_reason, StopReason::Exhausted);
        assert_eq!(summary.tests_produced, 2);
        assert_eq!(summary.coverage.total, None);

        Ok(())
    }

    #[test]
    fn unimplemented_features_abandon_the_path() -> anyhow::Result<()> {
        let mut executor = executor(Config::default());
        let mut coverage = CoverageTracker::new();

        let summary = executor.run(
            ExecutionState::new_at(ProgramPoint::statement(9)),
            &mut coverage,
            |_| false,
        )?;
        assert_eq!(summary.stop_reason, StopReason::Exhausted);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(
            summary.errors.payloads()[0].location,
            Some(ProgramPoint::statement(9))
        );
        assert_eq!(summary.stats.unimplemented_paths, 1);

        Ok(())
    }

    #[test]
    fn unimplemented_features_are_fatal_in_strict_mode() {
        let mut executor = executor(Config::default().with_strict(true));
        let mut coverage = CoverageTracker::new();

        let result = executor.run(
            ExecutionState::new_at(ProgramPoint::statement(9)),
            &mut coverage,
            |_| false,
        );
        let error = result.expect_err("Strict mode propagates the failure");
        assert!(matches!(
            error.payload,
            error::Error::Execution(error::execution::Error::Unimplemented { .. })
        ));
        assert_eq!(error.location, Some(ProgramPoint::statement(9)));
    }

    #[test]
    fn watchdog_stops_the_search() {
        let flag = Arc::new(AtomicBool::new(true));
        let mut executor = SymbolicExecutor::new(
            diamond,
            CountingSolver::default(),
            SelectionPolicy::depth_first(),
            Config::default(),
            FlagWatchdog::new(flag).polling_every(1).in_rc(),
        );
        let mut coverage = CoverageTracker::new();

        let result = executor.run(root(), &mut coverage, |_| false);
        let error = result.expect_err("The watchdog was already triggered");
        assert!(matches!(
            error.payload,
            error::Error::Execution(error::execution::Error::StoppedByWatchdog)
        ));
        assert_eq!(executor.stats().steps, 0);
    }
}
