//! This module contains the random-backtracking selection policy.

use crate::{
    branch::Branch,
    executor::policy::{
        backlog::{take_random_feasible, Pending},
        PolicyContext,
    },
    state::StateRef,
};

/// A policy that behaves like [`super::DepthFirst`] while following a path, but
/// resumes from a uniformly random backlog entry once the path is exhausted.
///
/// This gives up the locality of depth-first search in exchange for sampling
/// the whole frontier.
#[derive(Clone, Debug, Default)]
pub struct RandomBacktrack {
    backlog: Vec<Pending>,
}

impl RandomBacktrack {
    /// Creates a new random-backtracking policy with an empty backlog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the number of branches waiting in the backlog.
    #[must_use]
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    pub(super) fn pick(
        &mut self,
        batch: Vec<Branch>,
        context: &mut PolicyContext<'_>,
    ) -> Option<StateRef> {
        let mut candidates = Pending::number(batch);
        let chosen = take_random_feasible(&mut candidates, context);
        self.backlog.extend(candidates);
        chosen.map(Pending::adopt)
    }

    pub(super) fn resume(&mut self, context: &mut PolicyContext<'_>) -> Option<StateRef> {
        take_random_feasible(&mut self.backlog, context).map(Pending::adopt)
    }
}
