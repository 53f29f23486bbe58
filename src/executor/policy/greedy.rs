//! This module contains the coverage-guided greedy selection policy.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    branch::Branch,
    coverage::ProgramPoint,
    executor::policy::{
        backlog::{take_first_covering, take_random_feasible, Pending},
        PolicyContext,
    },
    state::StateRef,
};

/// The granularity at which the greedy policy measures coverage gain.
#[derive(Copy, Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Granularity {
    /// Every program point counts.
    Node,

    /// Only statements count.
    Statement,
}

impl Granularity {
    /// Checks if `point` is relevant at this granularity.
    #[must_use]
    pub fn considers(self, point: &ProgramPoint) -> bool {
        match self {
            Self::Node => true,
            Self::Statement => point.is_statement(),
        }
    }
}

/// A policy that prefers branches that may cover program points no accepted
/// test has covered yet.
///
/// # Falling Back to Randomness
///
/// Cyclic regions of a program can offer seemingly-new points indefinitely. To
/// avoid getting stuck in them, the policy counts the branching steps it has
/// taken since the last terminal state. Once that count reaches the configured
/// ceiling it stops scanning for coverage gain and chooses uniformly at random
/// until a terminal state is reached again.
#[derive(Clone, Debug)]
pub struct Greedy {
    /// The granularity at which coverage gain is measured.
    granularity: Granularity,

    /// Branches that were passed over while their look-ahead hints still
    /// promised new coverage.
    potential: Vec<Pending>,

    /// Branches that were passed over during random choice.
    backlog: Vec<Pending>,

    /// The number of multi-way picks since the last terminal state.
    steps_without_test: usize,
}

impl Greedy {
    /// Creates a new greedy policy measuring coverage at `granularity`.
    #[must_use]
    pub fn new(granularity: Granularity) -> Self {
        let potential = Vec::new();
        let backlog = Vec::new();
        let steps_without_test = 0;
        Self {
            granularity,
            potential,
            backlog,
            steps_without_test,
        }
    }

    /// Gets the granularity at which coverage gain is measured.
    #[must_use]
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Gets the number of multi-way picks since the last terminal state.
    #[must_use]
    pub fn steps_without_test(&self) -> usize {
        self.steps_without_test
    }

    /// Gets the number of branches in the potential backlog.
    #[must_use]
    pub fn potential_len(&self) -> usize {
        self.potential.len()
    }

    /// Gets the total number of branches waiting in either backlog.
    #[must_use]
    pub fn backlog_len(&self) -> usize {
        self.potential.len() + self.backlog.len()
    }

    /// Chooses among two or more freshly produced branches.
    pub(super) fn pick(
        &mut self,
        batch: Vec<Branch>,
        context: &mut PolicyContext<'_>,
    ) -> Option<StateRef> {
        self.steps_without_test += 1;
        let mut candidates = Pending::number(batch);

        if self.steps_without_test < context.max_steps_without_test() {
            if let Some(chosen) = take_first_covering(&mut candidates, context, self.granularity) {
                self.potential.extend(candidates);
                return Some(chosen.adopt());
            }
        } else {
            debug!(
                steps = self.steps_without_test,
                "Greedy search exceeded its step budget, choosing randomly"
            );
        }

        let chosen = take_random_feasible(&mut candidates, context);
        self.backlog.extend(candidates);
        chosen.map(Pending::adopt)
    }

    /// Chooses a branch to resume once the current path is exhausted.
    ///
    /// Branches that may still cover something new are preferred. If none
    /// remain, the potential backlog is merged into the ordinary one and a
    /// branch is drawn from that at random.
    pub(super) fn resume(&mut self, context: &mut PolicyContext<'_>) -> Option<StateRef> {
        if let Some(chosen) = take_first_covering(&mut self.potential, context, self.granularity) {
            return Some(chosen.adopt());
        }

        self.backlog.append(&mut self.potential);
        take_random_feasible(&mut self.backlog, context).map(Pending::adopt)
    }

    /// Records that a terminal state was reached.
    pub(super) fn notify_terminal(&mut self) {
        self.steps_without_test = 0;
    }
}
