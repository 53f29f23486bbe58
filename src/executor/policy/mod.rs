//! This module contains the selection policies that decide which branch the
//! executor follows next.
//!
//! # Picking and Resuming
//!
//! Every policy answers two questions:
//!
//! - **Pick:** Given the successors the stepper just produced for the current
//!   state, which one should become current? Passed-over branches may be kept
//!   in the policy's backlog.
//! - **Resume:** Once the current path has ended, which backlog entry should
//!   become current?
//!
//! A batch containing a single branch is always taken without consulting the
//! solver or the random number generator, and without being recorded as a
//! decision. Otherwise, a branch is only checked against the solver when it is
//! about to be adopted, and infeasible branches are silently dropped.

pub mod backlog;
pub mod depth_first;
pub mod greedy;
pub mod random_backtrack;
pub mod selected_branches;

use std::time::Duration;

use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

pub use self::{
    depth_first::DepthFirst,
    greedy::{Granularity, Greedy},
    random_backtrack::RandomBacktrack,
    selected_branches::{ReplayMismatch, SelectedBranches},
};
use crate::{
    branch::Branch,
    coverage::CoverageTracker,
    error::{self, replay},
    executor::SearchStats,
    interface::Solver,
    state::{ExecutionState, StateRef},
};

/// The exploration strategies that a [`SelectionPolicy`] can be built from.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ExplorationStrategy {
    /// Follow paths to their end, choosing randomly at branches and
    /// backtracking in stack order.
    DepthFirst,

    /// Prefer branches that may cover new program points of any kind.
    GreedyNode,

    /// Prefer branches that may cover new statements.
    GreedyStatement,

    /// Follow paths to their end, choosing randomly at branches and
    /// backtracking to a random pending branch.
    RandomBacktrack,

    /// Follow the branch decisions in the provided replay script.
    SelectedBranches(String),
}

/// The active selection policy, carrying its own backlog.
///
/// The set of policies is closed, and every call is dispatched on the variant.
#[derive(Clone, Debug)]
pub enum SelectionPolicy {
    DepthFirst(DepthFirst),
    Greedy(Greedy),
    RandomBacktrack(RandomBacktrack),
    SelectedBranches(SelectedBranches),
}

impl SelectionPolicy {
    /// Builds the policy described by `strategy`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `strategy` carries a malformed replay script. The
    /// error has no location, as the script is not tied to the program.
    pub fn new(strategy: &ExplorationStrategy) -> error::Result<Self> {
        let policy = match strategy {
            ExplorationStrategy::DepthFirst => Self::depth_first(),
            ExplorationStrategy::GreedyNode => Self::greedy(Granularity::Node),
            ExplorationStrategy::GreedyStatement => Self::greedy(Granularity::Statement),
            ExplorationStrategy::RandomBacktrack => Self::random_backtrack(),
            ExplorationStrategy::SelectedBranches(script) => Self::selected_branches(script)?,
        };

        Ok(policy)
    }

    /// Creates a depth-first policy.
    #[must_use]
    pub fn depth_first() -> Self {
        Self::DepthFirst(DepthFirst::new())
    }

    /// Creates a greedy policy measuring coverage at `granularity`.
    #[must_use]
    pub fn greedy(granularity: Granularity) -> Self {
        Self::Greedy(Greedy::new(granularity))
    }

    /// Creates a random-backtracking policy.
    #[must_use]
    pub fn random_backtrack() -> Self {
        Self::RandomBacktrack(RandomBacktrack::new())
    }

    /// Creates a replay policy from a comma-separated `script` of 1-based
    /// branch indices.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the script is malformed.
    pub fn selected_branches(script: &str) -> replay::Result<Self> {
        SelectedBranches::from_script(script).map(Self::SelectedBranches)
    }

    /// Gets a short name for the policy, for diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::DepthFirst(_) => "depth-first",
            Self::Greedy(greedy) => match greedy.granularity() {
                Granularity::Node => "greedy-node",
                Granularity::Statement => "greedy-statement",
            },
            Self::RandomBacktrack(_) => "random-backtrack",
            Self::SelectedBranches(_) => "selected-branches",
        }
    }

    /// Chooses which of the freshly produced branches in `batch` to continue
    /// with, if any.
    pub fn pick(&mut self, batch: Vec<Branch>, context: &mut PolicyContext<'_>) -> Option<StateRef> {
        if batch.len() <= 1 {
            return batch.into_iter().next().map(Branch::into_state);
        }

        trace!(policy = self.name(), candidates = batch.len(), "Picking a branch");
        match self {
            Self::DepthFirst(policy) => policy.pick(batch, context),
            Self::Greedy(policy) => policy.pick(batch, context),
            Self::RandomBacktrack(policy) => policy.pick(batch, context),
            Self::SelectedBranches(policy) => policy.pick(batch, context),
        }
    }

    /// Chooses a previously passed-over branch to continue with, if any remain.
    pub fn resume(&mut self, context: &mut PolicyContext<'_>) -> Option<StateRef> {
        match self {
            Self::DepthFirst(policy) => policy.resume(context),
            Self::Greedy(policy) => policy.resume(context),
            Self::RandomBacktrack(policy) => policy.resume(context),
            Self::SelectedBranches(_) => None,
        }
    }

    /// Informs the policy that the search reached a terminal state.
    pub fn notify_terminal(&mut self) {
        if let Self::Greedy(policy) = self {
            policy.notify_terminal();
        }
    }

    /// Gets the number of branches waiting in the policy's backlogs.
    #[must_use]
    pub fn backlog_len(&self) -> usize {
        match self {
            Self::DepthFirst(policy) => policy.backlog_len(),
            Self::Greedy(policy) => policy.backlog_len(),
            Self::RandomBacktrack(policy) => policy.backlog_len(),
            Self::SelectedBranches(_) => 0,
        }
    }

    /// Gets the reason a replay stopped following its script, if this is a
    /// replay policy and it did.
    #[must_use]
    pub fn replay_mismatch(&self) -> Option<&ReplayMismatch> {
        match self {
            Self::SelectedBranches(policy) => policy.mismatch(),
            _ => None,
        }
    }
}

/// The resources a policy may consult while choosing a branch.
///
/// Policies read global coverage but never write it, and every solver call they
/// make is counted in the search statistics.
pub struct PolicyContext<'a> {
    solver:                 &'a mut dyn Solver,
    coverage:               &'a CoverageTracker,
    rng:                    &'a mut StdRng,
    stats:                  &'a mut SearchStats,
    solver_timeout:         Option<Duration>,
    max_steps_without_test: usize,
}

impl<'a> PolicyContext<'a> {
    /// Bundles the provided resources into a context.
    #[must_use]
    pub fn new(
        solver: &'a mut dyn Solver,
        coverage: &'a CoverageTracker,
        rng: &'a mut StdRng,
        stats: &'a mut SearchStats,
        solver_timeout: Option<Duration>,
        max_steps_without_test: usize,
    ) -> Self {
        Self {
            solver,
            coverage,
            rng,
            stats,
            solver_timeout,
            max_steps_without_test,
        }
    }

    /// Asks the solver whether the path leading to `state` is feasible.
    ///
    /// Only a satisfiable verdict counts as feasible. An infeasible branch is
    /// counted as discarded.
    pub fn is_feasible(&mut self, state: &ExecutionState) -> bool {
        self.stats.solver_calls += 1;
        let result = self.solver.check(state.path_condition(), self.solver_timeout);
        let feasible = result.is_feasible();
        if !feasible {
            self.stats.discarded_branches += 1;
            debug!(%result, condition = %state.path_condition(), "Discarding branch");
        }

        feasible
    }

    /// Chooses an index in `0..len` uniformly at random.
    ///
    /// # Panics
    ///
    /// Panics if `len` is zero.
    pub fn choose(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// Gets the global coverage achieved by accepted tests.
    #[must_use]
    pub fn coverage(&self) -> &CoverageTracker {
        self.coverage
    }

    /// Gets the number of branching steps the greedy policies may take without
    /// producing a test before falling back to random choice.
    #[must_use]
    pub fn max_steps_without_test(&self) -> usize {
        self.max_steps_without_test
    }
}
