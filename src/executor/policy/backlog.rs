//! This module contains the entries that selection policies keep in their
//! backlogs, and the lazy feasibility-checked selection procedures the
//! policies share.

use tracing::trace;

use crate::{
    branch::Branch,
    coverage::{CoverageTracker, ProgramPoint},
    executor::policy::{greedy::Granularity, PolicyContext},
    state::StateRef,
};

/// A branch that has been offered to a policy but not yet adopted, along with
/// its 1-based position in the batch it was produced in.
#[derive(Clone, Debug)]
pub struct Pending {
    branch:  Branch,
    ordinal: usize,
}

impl Pending {
    /// Numbers the branches in `batch` from one, in the order the stepper
    /// produced them.
    #[must_use]
    pub fn number(batch: Vec<Branch>) -> Vec<Self> {
        batch
            .into_iter()
            .zip(1..)
            .map(|(branch, ordinal)| Self { branch, ordinal })
            .collect()
    }

    /// Gets the branch that is pending.
    #[must_use]
    pub fn branch(&self) -> &Branch {
        &self.branch
    }

    /// Gets the position of the branch in its batch, starting from one.
    #[must_use]
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Checks if taking the branch could cover a point, at the provided
    /// `granularity`, that `coverage` has not yet seen.
    #[must_use]
    pub fn covers_new(&self, coverage: &CoverageTracker, granularity: Granularity) -> bool {
        self.branch
            .reachable_points()
            .filter(|point| granularity.considers(point))
            .any(|point| !coverage.is_covered(point))
    }

    /// Consumes the entry, producing the state to continue from with this
    /// decision recorded on its trail.
    #[must_use]
    pub fn adopt(self) -> StateRef {
        self.branch.state().with_decision(self.ordinal)
    }

    /// Gets the point the pending state is at, for diagnostics.
    fn location(&self) -> Option<ProgramPoint> {
        self.branch.state().location()
    }
}

/// Removes candidates from `candidates` uniformly at random until one is found
/// to be feasible, and returns it.
///
/// Infeasible candidates are dropped. The remaining candidates keep their
/// relative order and have not been checked against the solver.
pub fn take_random_feasible(
    candidates: &mut Vec<Pending>,
    context: &mut PolicyContext<'_>,
) -> Option<Pending> {
    while !candidates.is_empty() {
        let index = context.choose(candidates.len());
        let candidate = candidates.remove(index);
        if context.is_feasible(candidate.branch.state()) {
            return Some(candidate);
        }
        trace!(ordinal = candidate.ordinal, location = ?candidate.location(), "Dropped infeasible candidate");
    }

    None
}

/// Removes and returns the first candidate, in order, that could cover
/// something new at `granularity` and is feasible.
///
/// Candidates that would cover something new but turn out to be infeasible are
/// dropped. All other candidates are left in place, unchecked.
pub fn take_first_covering(
    candidates: &mut Vec<Pending>,
    context: &mut PolicyContext<'_>,
    granularity: Granularity,
) -> Option<Pending> {
    let mut index = 0;
    while index < candidates.len() {
        if candidates[index].covers_new(context.coverage(), granularity) {
            let candidate = candidates.remove(index);
            if context.is_feasible(candidate.branch.state()) {
                return Some(candidate);
            }
            trace!(ordinal = candidate.ordinal, location = ?candidate.location(), "Dropped infeasible candidate");
        } else {
            index += 1;
        }
    }

    None
}
