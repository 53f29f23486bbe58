//! This module contains the symbolic expressions that make up path conditions
//! and variable bindings.
//!
//! The expressions are deliberately small. The executor never interprets them
//! itself; they exist so that steppers and solvers have a shared vocabulary.

use std::fmt::{Display, Formatter};

/// A symbolic expression over integers and booleans.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Expr {
    /// A concrete boolean.
    Bool(bool),

    /// A concrete integer.
    Int(i128),

    /// A free symbolic variable.
    Var(String),

    /// Boolean negation.
    Not(Box<Expr>),

    /// Boolean conjunction.
    And(Box<Expr>, Box<Expr>),

    /// Boolean disjunction.
    Or(Box<Expr>, Box<Expr>),

    /// Equality between two expressions.
    Eq(Box<Expr>, Box<Expr>),

    /// Signed less-than between two expressions.
    Lt(Box<Expr>, Box<Expr>),

    /// Integer addition.
    Add(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Constructs a free variable named `name`.
    #[must_use]
    pub fn var(name: impl Into<String>) -> Self {
        Self::Var(name.into())
    }

    /// Constructs the negation of `self`.
    #[must_use]
    #[allow(clippy::should_implement_trait)] // Builds a node rather than evaluating
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Constructs the conjunction of `self` and `other`.
    #[must_use]
    pub fn and(self, other: Expr) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// Constructs the disjunction of `self` and `other`.
    #[must_use]
    pub fn or(self, other: Expr) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// Constructs the equality of `self` and `other`.
    #[must_use]
    pub fn equals(self, other: Expr) -> Self {
        Self::Eq(Box::new(self), Box::new(other))
    }

    /// Constructs `self < other`.
    #[must_use]
    pub fn less_than(self, other: Expr) -> Self {
        Self::Lt(Box::new(self), Box::new(other))
    }

    /// Constructs `self + other`.
    #[must_use]
    #[allow(clippy::should_implement_trait)] // Builds a node rather than evaluating
    pub fn add(self, other: Expr) -> Self {
        Self::Add(Box::new(self), Box::new(other))
    }

    /// Checks if the expression is the literal `false`.
    #[must_use]
    pub fn is_false(&self) -> bool {
        matches!(self, Self::Bool(false))
    }

    /// Gets the names of every free variable in the expression, in the order in
    /// which they are first encountered.
    #[must_use]
    pub fn free_variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Self::Bool(_) | Self::Int(_) => (),
            Self::Var(name) => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            Self::Not(inner) => inner.collect_variables(names),
            Self::And(l, r) | Self::Or(l, r) | Self::Eq(l, r) | Self::Lt(l, r) | Self::Add(l, r) => {
                l.collect_variables(names);
                r.collect_variables(names);
            }
        }
    }
}

impl From<bool> for Expr {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i128> for Expr {
    fn from(value: i128) -> Self {
        Self::Int(value)
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Var(name) => write!(f, "{name}"),
            Self::Not(inner) => write!(f, "!({inner})"),
            Self::And(l, r) => write!(f, "({l} && {r})"),
            Self::Or(l, r) => write!(f, "({l} || {r})"),
            Self::Eq(l, r) => write!(f, "({l} == {r})"),
            Self::Lt(l, r) => write!(f, "({l} < {r})"),
            Self::Add(l, r) => write!(f, "({l} + {r})"),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::state::expression::Expr;

    #[test]
    fn displays_nested_expressions() {
        let expr = Expr::var("x").add(Expr::Int(1)).less_than(Expr::Int(5)).not();
        assert_eq!(expr.to_string(), "!(((x + 1) < 5))");
    }

    #[test]
    fn collects_free_variables_once() {
        let expr = Expr::var("a")
            .equals(Expr::var("b"))
            .and(Expr::var("a").less_than(Expr::Int(3)));
        assert_eq!(expr.free_variables(), vec!["a", "b"]);
    }
}
