//! This module contains the depth-first selection policy.

use crate::{
    branch::Branch,
    executor::policy::{
        backlog::{take_random_feasible, Pending},
        PolicyContext,
    },
    state::StateRef,
};

/// A policy that follows one path to its end before backtracking to the most
/// recently passed-over branch.
///
/// The choice among a batch of branches is uniformly random. Branches that are
/// passed over are pushed onto a stack without being checked, and are only
/// checked against the solver once popped.
#[derive(Clone, Debug, Default)]
pub struct DepthFirst {
    backlog: Vec<Pending>,
}

impl DepthFirst {
    /// Creates a new depth-first policy with an empty backlog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the number of branches waiting in the backlog.
    #[must_use]
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// Chooses among two or more freshly produced branches.
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

    /// Pops the most recently stored feasible branch.
    pub(super) fn resume(&mut self, context: &mut PolicyContext<'_>) -> Option<StateRef> {
        while let Some(entry) = self.backlog.pop() {
            if context.is_feasible(entry.branch().state()) {
                return Some(entry.adopt());
            }
        }

        None
    }
}

#[cfg(test)]
mod test {
    use crate::{
        coverage::ProgramPoint,
        executor::policy::{depth_first::DepthFirst, test_util::Harness},
        state::ExecutionState,
    };

    #[test]
    fn resumes_in_stack_order() {
        let mut harness = Harness::new(1);
        let root = ExecutionState::root();
        let mut policy = DepthFirst::new();

        let first = vec![
            harness.branch_to(&root, ProgramPoint::node(1)),
            harness.branch_to(&root, ProgramPoint::node(2)),
        ];
        let chosen = policy.pick(first, &mut harness.context()).expect("Both are feasible");
        let second = vec![
            harness.branch_to(&chosen, ProgramPoint::node(3)),
            harness.branch_to(&chosen, ProgramPoint::node(4)),
        ];
        policy.pick(second, &mut harness.context()).expect("Both are feasible");
        assert_eq!(policy.backlog_len(), 2);

        // The most recent leftover is the sibling from the second batch, which
        // sits one decision deeper than the sibling from the first.
        let resumed = policy.resume(&mut harness.context()).expect("Backlog is not empty");
        assert_eq!(resumed.decision_trail().len(), 2);
        let resumed = policy.resume(&mut harness.context()).expect("Backlog is not empty");
        assert_eq!(resumed.decision_trail().len(), 1);
        assert!(policy.resume(&mut harness.context()).is_none());
    }

    #[test]
    fn backlog_entries_are_checked_lazily() {
        let mut harness = Harness::new(2);
        let root = ExecutionState::root();
        let mut policy = DepthFirst::new();

        let batch = vec![
            harness.branch_to(&root, ProgramPoint::node(1)),
            harness.branch_to(&root, ProgramPoint::node(2)),
            harness.branch_to(&root, ProgramPoint::node(3)),
        ];
        policy.pick(batch, &mut harness.context()).expect("All are feasible");

        // Only the chosen branch has been checked.
        assert_eq!(harness.solver.calls, 1);
        assert_eq!(policy.backlog_len(), 2);
    }

    #[test]
    fn infeasible_entries_are_skipped_on_resume() {
        let mut harness = Harness::new(3);
        let root = ExecutionState::root();
        let mut policy = DepthFirst::new();

        let batch = vec![
            harness.branch_to(&root, ProgramPoint::node(1)),
            harness.infeasible_branch(&root),
            harness.infeasible_branch(&root),
        ];
        policy.pick(batch, &mut harness.context()).expect("One branch is feasible");
        assert!(policy.resume(&mut harness.context()).is_none());
        assert_eq!(policy.backlog_len(), 0);
    }
}
