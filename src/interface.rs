//! This module contains the interfaces to the collaborators that the executor
//! drives but does not implement: the stepper that gives semantics to the
//! program, and the solver that decides feasibility of paths.

use std::{
    fmt::{Display, Formatter},
    time::Duration,
};

use thiserror::Error;

use crate::{
    branch::Branch,
    coverage::ProgramPoint,
    state::{path_condition::PathCondition, ExecutionState},
};

/// The interface to the program interpreter.
///
/// Given a non-terminal state, the stepper advances it by one program point and
/// returns every possible successor. An empty batch is a dead end.
pub trait Stepper {
    /// Advances `state` by one step.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the stepper cannot give semantics to the program point
    /// that `state` is at.
    fn step(&mut self, state: &ExecutionState) -> StepResult;
}

/// Any suitable closure can be used as a stepper.
impl<F> Stepper for F
where
    F: FnMut(&ExecutionState) -> StepResult,
{
    fn step(&mut self, state: &ExecutionState) -> StepResult {
        self(state)
    }
}

/// The result of stepping an execution state.
pub type StepResult = Result<Vec<Branch>, Unimplemented>;

/// Raised by a [`Stepper`] when it meets a language feature it has no semantics
/// for.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("Unimplemented feature: {feature}")]
pub struct Unimplemented {
    /// A description of the feature that is not implemented.
    pub feature: String,

    /// The program point at which the feature was encountered, if known.
    pub location: Option<ProgramPoint>,
}

impl Unimplemented {
    /// Constructs a new error for `feature`.
    #[must_use]
    pub fn new(feature: impl Into<String>) -> Self {
        let feature = feature.into();
        let location = None;
        Self { feature, location }
    }

    /// Attaches the program point at which the feature was encountered.
    #[must_use]
    pub fn at(mut self, location: ProgramPoint) -> Self {
        self.location = Some(location);
        self
    }
}

/// The interface to the constraint solver.
pub trait Solver {
    /// Checks whether `condition` is satisfiable, taking no longer than
    /// `timeout` if one is provided.
    ///
    /// A solver that runs out of time should report [`SolverResult::Unknown`].
    fn check(&mut self, condition: &PathCondition, timeout: Option<Duration>) -> SolverResult;
}

/// The verdict of a [`Solver`] on a path condition.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum SolverResult {
    /// There is an assignment that satisfies the path condition.
    Satisfiable,

    /// No assignment satisfies the path condition.
    Unsatisfiable,

    /// The solver could not decide, for the provided reason.
    Unknown(String),
}

impl SolverResult {
    /// Checks if the result allows a branch to be adopted.
    ///
    /// An unknown result is treated the same as an unsatisfiable one so that
    /// the search always makes progress.
    #[must_use]
    pub fn is_feasible(&self) -> bool {
        matches!(self, Self::Satisfiable)
    }
}

impl Display for SolverResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Satisfiable => write!(f, "sat"),
            Self::Unsatisfiable => write!(f, "unsat"),
            Self::Unknown(reason) => write!(f, "unknown ({reason})"),
        }
    }
}
