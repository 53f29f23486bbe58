//! This library implements the search engine at the core of a
//! symbolic-execution based test generator. Given a program interpreter (the
//! [`interface::Stepper`]) and a constraint solver (the
//! [`interface::Solver`]), it decides which execution path to follow next,
//! backtracks when a path ends, and records the program points that the
//! produced tests cover.
//!
//! # How it Works
//!
//! From a very high level, a search proceeds as follows:
//!
//! 1. The caller builds a root [`state::ExecutionState`] and a
//!    [`coverage::CoverageTracker`], and hands them to
//!    [`executor::SymbolicExecutor::run`] along with a completion callback.
//! 2. The executor repeatedly asks the stepper for the successors of the
//!    current state. Each successor is a [`branch::Branch`].
//! 3. The active [`executor::SelectionPolicy`] picks which branch to follow,
//!    checking its feasibility with the solver only when it is about to be
//!    taken. Branches that are passed over are kept in the policy's backlog.
//! 4. When a terminal state is reached it is handed to the completion
//!    callback, and the points it visited are merged into the global coverage.
//!    The policy then resumes from its backlog until it is empty, the callback
//!    asks for the search to stop, or a configured limit is reached.
//!
//! Every terminal state carries the decisions that led to it, so its path can
//! be replayed exactly using the
//! [`executor::policy::SelectedBranches`] policy.
//!
//! # Basic Usage
//!
//! ```
//! use path_search::{
//!     branch::Branch,
//!     coverage::{CoverageTracker, ProgramPoint},
//!     executor::{Config, SelectionPolicy, SymbolicExecutor},
//!     interface::{Solver, SolverResult, StepResult},
//!     state::{path_condition::PathCondition, ExecutionState},
//!     watchdog::LazyWatchdog,
//! };
//!
//! /// Every path is feasible.
//! struct Trivial;
//!
//! impl Solver for Trivial {
//!     fn check(&mut self, _: &PathCondition, _: Option<std::time::Duration>) -> SolverResult {
//!         SolverResult::Satisfiable
//!     }
//! }
//!
//! /// A program that branches two ways at the start and then ends.
//! fn step(state: &ExecutionState) -> StepResult {
//!     let next = |id| Branch::new(state.successor().at(ProgramPoint::node(id)).terminate().finish());
//!     Ok(vec![next(1), next(2)])
//! }
//!
//! let mut executor = SymbolicExecutor::new(
//!     step,
//!     Trivial,
//!     SelectionPolicy::depth_first(),
//!     Config::default().with_seed(0),
//!     LazyWatchdog.in_rc(),
//! );
//! let mut coverage = CoverageTracker::new();
//! let summary = executor
//!     .run(ExecutionState::root(), &mut coverage, |_| false)
//!     .unwrap();
//!
//! assert_eq!(summary.tests_produced, 2);
//! assert_eq!(coverage.len(), 2);
//! ```

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming

pub mod branch;
pub mod constant;
pub mod coverage;
pub mod error;
pub mod executor;
pub mod interface;
pub mod state;
pub mod watchdog;

// Re-exports to provide the library interface.
pub use executor::{Config, RunSummary, SelectionPolicy, StopReason, SymbolicExecutor};
