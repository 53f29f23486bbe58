//! This module contains the definition of a [`Branch`], one possible
//! continuation of a path.

use crate::{
    coverage::{CoverageSet, ProgramPoint},
    state::{expression::Expr, StateRef},
};

/// The outcome of advancing an execution state by one step.
///
/// A branch pairs the successor state with the constraint under which it is
/// taken and a hint describing what taking it might cover. Branches are
/// produced in batches by the stepper, are never modified afterwards, and are
/// consumed at most once.
#[derive(Clone, Debug)]
pub struct Branch {
    /// The state that results from taking this branch.
    state: StateRef,

    /// The constraint that must hold for this branch to be taken.
    ///
    /// It has already been folded into the path condition of `state`, and is
    /// kept only for diagnostics.
    constraint: Option<Expr>,

    /// Program points that may be reached if this branch is taken.
    ///
    /// This is an over-approximation used for look-ahead, and may contain
    /// points that can never actually be reached.
    potential_coverage: CoverageSet,
}

impl Branch {
    /// Constructs an unconditional branch leading to `state`.
    #[must_use]
    pub fn new(state: StateRef) -> Self {
        let constraint = None;
        let potential_coverage = CoverageSet::new();
        Self {
            state,
            constraint,
            potential_coverage,
        }
    }

    /// Constructs a branch leading to `state` that is taken when `constraint`
    /// holds.
    ///
    /// The caller is responsible for having added `constraint` to the path
    /// condition of `state`.
    #[must_use]
    pub fn guarded(constraint: Expr, state: StateRef) -> Self {
        let constraint = Some(constraint);
        let potential_coverage = CoverageSet::new();
        Self {
            state,
            constraint,
            potential_coverage,
        }
    }

    /// Attaches the look-ahead hint `points` to the branch.
    #[must_use]
    pub fn with_potential_coverage(mut self, points: impl IntoIterator<Item = ProgramPoint>) -> Self {
        self.potential_coverage.extend(points);
        self
    }

    /// Gets the state this branch leads to.
    #[must_use]
    pub fn state(&self) -> &StateRef {
        &self.state
    }

    /// Consumes the branch to get the state it leads to.
    #[must_use]
    pub fn into_state(self) -> StateRef {
        self.state
    }

    /// Gets the constraint under which the branch is taken, if any.
    #[must_use]
    pub fn constraint(&self) -> Option<&Expr> {
        self.constraint.as_ref()
    }

    /// Gets the points that may be reached if the branch is taken.
    #[must_use]
    pub fn potential_coverage(&self) -> &CoverageSet {
        &self.potential_coverage
    }

    /// Iterates over every point this branch is associated with: those the
    /// successor has already touched, followed by those it might touch.
    pub fn reachable_points(&self) -> impl Iterator<Item = &ProgramPoint> {
        self.state
            .visited()
            .iter()
            .chain(self.potential_coverage.iter())
    }
}
