//! This module contains the definition of the [`PathCondition`], the
//! constraints that must hold for a path to be taken.

use std::fmt::{Display, Formatter};

use im::{vector, Vector};
use itertools::Itertools;

use crate::state::expression::Expr;

/// An ordered conjunction of the boolean constraints accumulated along a path.
///
/// Path conditions only ever grow. Extending a path condition produces a new
/// one and leaves the original untouched, so two paths that forked from a
/// common ancestor share nothing mutable once they diverge. The common prefix
/// itself is shared structurally rather than copied.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PathCondition {
    constraints: Vector<Expr>,
}

impl PathCondition {
    /// Creates a new, empty, path condition that is trivially satisfiable.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new path condition that is `self` extended by `constraint`.
    #[must_use]
    pub fn with(&self, constraint: Expr) -> Self {
        let mut constraints = self.constraints.clone();
        constraints.push_back(constraint);
        Self { constraints }
    }

    /// Gets the constraints in the order in which they were added.
    #[must_use]
    pub fn constraints(&self) -> vector::Iter<'_, Expr> {
        self.constraints.iter()
    }

    /// Gets the number of constraints in the path condition.
    #[must_use]
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Checks if the path condition is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Folds the path condition into a single conjunction.
    ///
    /// An empty path condition is `true`.
    #[must_use]
    pub fn conjunction(&self) -> Expr {
        self.constraints
            .iter()
            .cloned()
            .reduce(Expr::and)
            .unwrap_or(Expr::Bool(true))
    }

    /// Checks if `prefix` is a prefix of `self`, as is the case for the path
    /// condition of any ancestor of a state.
    #[must_use]
    pub fn extends(&self, prefix: &PathCondition) -> bool {
        self.len() >= prefix.len()
            && self
                .constraints()
                .zip(prefix.constraints())
                .all(|(own, theirs)| own == theirs)
    }
}

impl Display for PathCondition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "true")
        } else {
            write!(f, "{}", self.constraints.iter().join(" && "))
        }
    }
}
