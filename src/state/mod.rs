//! This module contains the definition of the [`ExecutionState`], a snapshot of
//! a single in-progress symbolic path.
//!
//! # Immutability
//!
//! Execution states are never mutated once they have been built. The stepper
//! derives new states from old ones through [`ExecutionState::successor`], and
//! the executor only ever swaps which state is current. This is what makes it
//! safe for a backlog to hold on to a state for an arbitrarily long time and
//! resume it later.
//!
//! The contents of a state are held in persistent collections, so deriving a
//! successor shares everything it does not change with its parent.

pub mod expression;
pub mod path_condition;

use std::rc::Rc;

use derivative::Derivative;
use im::{OrdMap, Vector};
use itertools::Itertools;
use uuid::Uuid;

use crate::{
    constant::REPLAY_SCRIPT_SEPARATOR,
    coverage::{CoverageSet, ProgramPoint},
    state::{expression::Expr, path_condition::PathCondition},
};

/// A shared handle to an immutable execution state.
///
/// A state is freed once the last backlog entry or current-state slot that
/// refers to it is dropped.
pub type StateRef = Rc<ExecutionState>;

/// A side effect of the program that has been observed along a path but not yet
/// acted upon, such as a packet being emitted on a port.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SideEffect {
    /// The name of the effect.
    pub name: String,

    /// The symbolic payload of the effect.
    pub value: Expr,
}

impl SideEffect {
    /// Constructs a new side effect called `name` carrying `value`.
    #[must_use]
    pub fn new(name: impl Into<String>, value: Expr) -> Self {
        let name = name.into();
        Self { name, value }
    }
}

/// A snapshot of one in-progress symbolic path.
///
/// Two states compare equal if they describe the same path, regardless of their
/// identities. This allows states produced by two separate runs to be compared.
#[derive(Clone, Debug, Derivative)]
#[derivative(Eq, PartialEq)]
pub struct ExecutionState {
    /// The unique identity of this state.
    #[derivative(PartialEq = "ignore")]
    id: Uuid,

    /// The identity of the state that this one was derived from, if any.
    #[derivative(PartialEq = "ignore")]
    parent: Option<Uuid>,

    /// The program point that execution will continue from.
    location: Option<ProgramPoint>,

    /// The constraints that must hold for this path to be taken.
    path_condition: PathCondition,

    /// The symbolic variable store.
    bindings: OrdMap<String, Expr>,

    /// The side effects that have been observed along this path.
    pending_effects: Vector<SideEffect>,

    /// The program points touched while constructing this path.
    ///
    /// These are not yet confirmed as covered until a test is produced from the
    /// path.
    visited: CoverageSet,

    /// The 1-based ordinals of the alternatives chosen at every branching point
    /// along this path.
    decision_trail: Vector<usize>,

    /// The number of steps taken from the root state to reach this one.
    depth: usize,

    /// Whether execution of this path has reached the end of the program.
    terminal: bool,
}

impl ExecutionState {
    /// Constructs a new root state with an empty path condition and no
    /// location.
    #[must_use]
    pub fn root() -> Self {
        Self {
            id:              Uuid::new_v4(),
            parent:          None,
            location:        None,
            path_condition:  PathCondition::new(),
            bindings:        OrdMap::new(),
            pending_effects: Vector::new(),
            visited:         CoverageSet::new(),
            decision_trail:  Vector::new(),
            depth:           0,
            terminal:        false,
        }
    }

    /// Constructs a new root state that begins execution at `location`.
    ///
    /// The location is not marked as visited until the stepper moves past it.
    #[must_use]
    pub fn new_at(location: ProgramPoint) -> Self {
        let mut state = Self::root();
        state.location = Some(location);
        state
    }

    /// Wraps the state into a [`StateRef`].
    #[must_use]
    pub fn into_ref(self) -> StateRef {
        Rc::new(self)
    }

    /// Begins building a successor of this state.
    ///
    /// The successor starts out as a copy of this state with a fresh identity
    /// and a depth one greater than this one.
    #[must_use]
    pub fn successor(&self) -> Successor {
        let mut state = self.clone();
        state.id = Uuid::new_v4();
        state.parent = Some(self.id);
        state.depth = self.depth + 1;

        Successor { state }
    }

    /// Creates a copy of this state with `ordinal` appended to its decision
    /// trail.
    ///
    /// The copy keeps the identity of this state, as it describes exactly the
    /// same path with one more recorded decision.
    #[must_use]
    pub(crate) fn with_decision(&self, ordinal: usize) -> StateRef {
        let mut state = self.clone();
        state.decision_trail.push_back(ordinal);
        Rc::new(state)
    }

    /// Gets the unique identity of this state.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Gets the identity of the state this one was derived from, if any.
    #[must_use]
    pub fn parent(&self) -> Option<Uuid> {
        self.parent
    }

    /// Gets the program point that execution continues from, if any.
    #[must_use]
    pub fn location(&self) -> Option<ProgramPoint> {
        self.location
    }

    /// Checks if the path has reached the end of the program.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Gets the program points this path has touched.
    #[must_use]
    pub fn visited(&self) -> &CoverageSet {
        &self.visited
    }

    /// Gets the constraints that must hold for this path to be taken.
    #[must_use]
    pub fn path_condition(&self) -> &PathCondition {
        &self.path_condition
    }

    /// Gets the symbolic variable store.
    #[must_use]
    pub fn bindings(&self) -> &OrdMap<String, Expr> {
        &self.bindings
    }

    /// Gets the value bound to `name`, if any.
    #[must_use]
    pub fn binding(&self, name: &str) -> Option<&Expr> {
        self.bindings.get(name)
    }

    /// Gets the side effects observed along this path, in order.
    #[must_use]
    pub fn pending_effects(&self) -> &Vector<SideEffect> {
        &self.pending_effects
    }

    /// Gets the ordinals of the alternatives chosen at each branching point.
    #[must_use]
    pub fn decision_trail(&self) -> &Vector<usize> {
        &self.decision_trail
    }

    /// Renders the decision trail as a replay script that can be passed to
    /// [`crate::executor::policy::SelectedBranches::from_script`] to follow this
    /// path again.
    #[must_use]
    pub fn replay_script(&self) -> String {
        self.decision_trail
            .iter()
            .join(&REPLAY_SCRIPT_SEPARATOR.to_string())
    }

    /// Gets the number of steps taken from the root to reach this state.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Default for ExecutionState {
    fn default() -> Self {
        Self::root()
    }
}

/// A builder for a new [`ExecutionState`] derived from an existing one.
///
/// This is the only way to produce a state with different contents, and is
/// intended for use by [`crate::interface::Stepper`] implementations.
#[derive(Clone, Debug)]
#[must_use]
pub struct Successor {
    state: ExecutionState,
}

impl Successor {
    /// Moves the successor to `location`, marking it as visited.
    pub fn at(mut self, location: ProgramPoint) -> Self {
        self.state.location = Some(location);
        self.state.visited.insert(location);
        self
    }

    /// Marks `point` as visited without moving the successor there.
    pub fn visit(mut self, point: ProgramPoint) -> Self {
        self.state.visited.insert(point);
        self
    }

    /// Adds `constraint` to the successor's path condition.
    pub fn assume(mut self, constraint: Expr) -> Self {
        self.state.path_condition = self.state.path_condition.with(constraint);
        self
    }

    /// Binds `name` to `value` in the successor's variable store, replacing any
    /// previous binding.
    pub fn bind(mut self, name: impl Into<String>, value: Expr) -> Self {
        self.state.bindings.insert(name.into(), value);
        self
    }

    /// Records `effect` as pending on the successor.
    pub fn emit(mut self, effect: SideEffect) -> Self {
        self.state.pending_effects.push_back(effect);
        self
    }

    /// Marks the successor as having reached the end of the program.
    pub fn terminate(mut self) -> Self {
        self.state.terminal = true;
        self
    }

    /// Finishes building the successor.
    #[must_use]
    pub fn build(self) -> ExecutionState {
        self.state
    }

    /// Finishes building the successor and wraps it into a [`StateRef`].
    #[must_use]
    pub fn finish(self) -> StateRef {
        Rc::new(self.state)
    }
}

#[cfg(test)]
mod test {
    use im::vector;

    use crate::{
        coverage::ProgramPoint,
        state::{expression::Expr, ExecutionState, SideEffect},
    };

    #[test]
    fn root_state_is_empty() {
        let root = ExecutionState::root();
        assert!(!root.is_terminal());
        assert!(root.path_condition().is_empty());
        assert!(root.visited().is_empty());
        assert!(root.decision_trail().is_empty());
        assert_eq!(root.depth(), 0);
        assert_eq!(root.parent(), None);
    }

    #[test]
    fn successors_do_not_affect_their_parent() {
        let root = ExecutionState::new_at(ProgramPoint::node(0));
        let child = root
            .successor()
            .at(ProgramPoint::statement(1))
            .assume(Expr::var("x").less_than(Expr::Int(4)))
            .bind("y", Expr::Int(2))
            .emit(SideEffect::new("emit", Expr::var("x")))
            .terminate()
            .build();

        assert_ne!(child.id(), root.id());
        assert_eq!(child.parent(), Some(root.id()));
        assert_eq!(child.depth(), 1);
        assert!(child.is_terminal());
        assert!(child.visited().contains(&ProgramPoint::statement(1)));
        assert_eq!(child.binding("y"), Some(&Expr::Int(2)));
        assert_eq!(child.pending_effects().len(), 1);
        assert!(child.path_condition().extends(root.path_condition()));

        assert!(!root.is_terminal());
        assert!(root.visited().is_empty());
        assert!(root.bindings().is_empty());
        assert_eq!(root.location(), Some(ProgramPoint::node(0)));
    }

    #[test]
    fn successors_share_unchanged_contents_with_their_parent() {
        let parent = ExecutionState::root()
            .successor()
            .bind("x", Expr::Int(1))
            .bind("y", Expr::Int(2))
            .build();
        let child = parent.successor().assume(Expr::var("x").equals(Expr::Int(1))).build();
        let rebound = child.successor().bind("x", Expr::Int(3)).build();

        assert!(child.bindings().ptr_eq(parent.bindings()));
        assert!(!rebound.bindings().ptr_eq(child.bindings()));
        assert_eq!(child.binding("x"), Some(&Expr::Int(1)));
        assert_eq!(rebound.binding("x"), Some(&Expr::Int(3)));
    }

    #[test]
    fn equality_ignores_identity() {
        let first = ExecutionState::root().successor().visit(ProgramPoint::node(3)).build();
        let second = ExecutionState::root().successor().visit(ProgramPoint::node(3)).build();

        assert_ne!(first.id(), second.id());
        assert_eq!(first, second);
    }

    #[test]
    fn decisions_render_as_a_replay_script() {
        let state = ExecutionState::root();
        let state = state.with_decision(1);
        let state = state.with_decision(2);
        let state = state.with_decision(5);

        assert_eq!(*state.decision_trail(), vector![1, 2, 5]);
        assert_eq!(state.replay_script(), "1,2,5");
    }
}
