//! This module contains common utilities for simplifying the writing of
//! integration tests for this library.
//!
//! Programs are described as tables of numbered statements. Each statement
//! either falls through to another, branches on a set of guards, ends the
//! program, or uses a feature the stepper does not support.

#![cfg(test)]
#![allow(unused)] // Not every test file uses every helper

use std::{collections::BTreeMap, time::Duration};

use path_search::{
    branch::Branch,
    coverage::{CoverageTracker, ProgramPoint},
    executor::{Config, SelectionPolicy, SymbolicExecutor},
    interface::{Solver, SolverResult, StepResult, Stepper, Unimplemented},
    state::{expression::Expr, path_condition::PathCondition, ExecutionState},
    watchdog::{DynWatchdog, LazyWatchdog},
};

/// A single statement of a [`ToyProgram`].
#[derive(Clone, Debug)]
pub enum Statement {
    /// Continues to the statement with the given id.
    Goto(u32),

    /// Continues to one of the statements, under the corresponding guard.
    Branch(Vec<(Expr, u32)>),

    /// Ends the program.
    Exit,

    /// A statement the stepper has no semantics for.
    Unsupported(&'static str),
}

/// A table-driven program, stepped one statement at a time.
#[derive(Clone, Debug, Default)]
pub struct ToyProgram {
    statements: BTreeMap<u32, Statement>,

    /// The number of times the program has been stepped.
    pub steps: usize,
}

impl ToyProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn goto(mut self, id: u32, next: u32) -> Self {
        self.statements.insert(id, Statement::Goto(next));
        self
    }

    pub fn branch(mut self, id: u32, arms: impl IntoIterator<Item = (Expr, u32)>) -> Self {
        self.statements.insert(id, Statement::Branch(arms.into_iter().collect()));
        self
    }

    pub fn exit(mut self, id: u32) -> Self {
        self.statements.insert(id, Statement::Exit);
        self
    }

    pub fn unsupported(mut self, id: u32, feature: &'static str) -> Self {
        self.statements.insert(id, Statement::Unsupported(feature));
        self
    }

    /// A program of `len` statements that runs straight through.
    pub fn straight_line(len: u32) -> Self {
        (0..len).fold(Self::new(), |program, id| program.goto(id, id + 1)).exit(len)
    }

    /// A program that branches on `x < 5` at statement 0, visiting statement 1
    /// or 2 before rejoining at statement 3.
    pub fn diamond() -> Self {
        Self::new()
            .branch(0, [(less_than_five(), 1), (less_than_five().not(), 2)])
            .goto(1, 3)
            .goto(2, 3)
            .exit(3)
    }

    /// A program of `rungs` consecutive two-way branches, giving `2^rungs`
    /// paths.
    ///
    /// Rung `i` branches at statement `3i` to statements `3i + 1` and `3i + 2`,
    /// which both rejoin at statement `3(i + 1)`.
    pub fn ladder(rungs: u32) -> Self {
        (0..rungs)
            .fold(Self::new(), |program, rung| {
                let at = 3 * rung;
                let guard = Expr::var(format!("x{rung}")).less_than(Expr::Int(0));
                program
                    .branch(at, [(guard.clone(), at + 1), (guard.not(), at + 2)])
                    .goto(at + 1, at + 3)
                    .goto(at + 2, at + 3)
            })
            .exit(3 * rungs)
    }

    /// Gets every statement of the program as a program point.
    pub fn points(&self) -> Vec<ProgramPoint> {
        self.statements.keys().copied().map(ProgramPoint::statement).collect()
    }

    /// Builds the state at the start of the program.
    pub fn root(&self) -> ExecutionState {
        let entry = self.statements.keys().next().copied().unwrap_or_default();
        self.enter(&ExecutionState::root(), entry).build()
    }

    /// Begins a successor of `state` that moves to `id`, ending the path if
    /// that statement exits.
    fn enter(&self, state: &ExecutionState, id: u32) -> path_search::state::Successor {
        let successor = state.successor().at(ProgramPoint::statement(id));
        match self.statements.get(&id) {
            Some(Statement::Exit) => successor.terminate(),
            _ => successor,
        }
    }

    /// The statement after `id` when it falls through, used as a look-ahead
    /// hint.
    fn lookahead(&self, id: u32) -> Option<ProgramPoint> {
        match self.statements.get(&id) {
            Some(Statement::Goto(next)) => Some(ProgramPoint::statement(*next)),
            _ => None,
        }
    }
}

impl Stepper for ToyProgram {
    fn step(&mut self, state: &ExecutionState) -> StepResult {
        self.steps += 1;
        let Some(location) = state.location() else {
            return Err(Unimplemented::new("a state without a location"));
        };

        match self.statements.get(&location.id()) {
            Some(Statement::Goto(next)) => Ok(vec![Branch::new(self.enter(state, *next).finish())]),
            Some(Statement::Branch(arms)) => Ok(arms
                .iter()
                .map(|(guard, target)| {
                    let successor = self.enter(state, *target).assume(guard.clone()).finish();
                    Branch::guarded(guard.clone(), successor)
                        .with_potential_coverage(self.lookahead(*target))
                })
                .collect()),
            Some(Statement::Exit) => Ok(vec![]),
            Some(Statement::Unsupported(feature)) => Err(Unimplemented::new(*feature).at(location)),
            None => Err(Unimplemented::new(format!("missing statement {location}")).at(location)),
        }
    }
}

/// A solver whose verdicts are decided by the constraints a path contains.
///
/// A path condition containing any of the `unsatisfiable` constraints is
/// unsatisfiable, one containing any of the `unknown` constraints is unknown,
/// and everything else is satisfiable.
#[derive(Clone, Debug, Default)]
pub struct ScriptedSolver {
    pub unsatisfiable: Vec<Expr>,
    pub unknown:       Vec<Expr>,

    /// The number of times the solver has been asked.
    pub calls: usize,

    /// The time limit passed to the most recent call.
    pub last_timeout: Option<Duration>,
}

impl ScriptedSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(mut self, constraint: Expr) -> Self {
        self.unsatisfiable.push(constraint);
        self
    }

    pub fn undecided_on(mut self, constraint: Expr) -> Self {
        self.unknown.push(constraint);
        self
    }
}

impl Solver for ScriptedSolver {
    fn check(&mut self, condition: &PathCondition, timeout: Option<Duration>) -> SolverResult {
        self.calls += 1;
        self.last_timeout = timeout;

        let contains = |set: &[Expr]| condition.constraints().any(|c| set.contains(c));
        if contains(&self.unsatisfiable) {
            SolverResult::Unsatisfiable
        } else if contains(&self.unknown) {
            SolverResult::Unknown("timeout".into())
        } else {
            SolverResult::Satisfiable
        }
    }
}

/// The guard of the first arm of [`ToyProgram::diamond`].
pub fn less_than_five() -> Expr {
    Expr::var("x").less_than(Expr::Int(5))
}

/// The executor type used throughout the tests.
pub type Executor = SymbolicExecutor<ToyProgram, ScriptedSolver>;

/// Constructs an executor over `program` that never gets stopped by a
/// watchdog.
pub fn new_executor(
    program: ToyProgram,
    solver: ScriptedSolver,
    policy: SelectionPolicy,
    config: Config,
) -> Executor {
    new_executor_with_watchdog(program, solver, policy, config, LazyWatchdog.in_rc())
}

/// Constructs an executor over `program` that is stopped by `watchdog`.
pub fn new_executor_with_watchdog(
    program: ToyProgram,
    solver: ScriptedSolver,
    policy: SelectionPolicy,
    config: Config,
    watchdog: DynWatchdog,
) -> Executor {
    SymbolicExecutor::new(program, solver, policy, config, watchdog)
}

/// Runs `policy` over `program` to exhaustion, returning every terminal state
/// that was reached.
pub fn explore(
    program: ToyProgram,
    policy: SelectionPolicy,
    seed: u64,
) -> anyhow::Result<Vec<ExecutionState>> {
    let root = program.root();
    let mut executor = new_executor(
        program,
        ScriptedSolver::new(),
        policy,
        Config::default().with_seed(seed),
    );
    let mut coverage = CoverageTracker::new();
    let mut terminals = Vec::new();

    executor.run(root, &mut coverage, |state| {
        terminals.push(state.clone());
        false
    })?;

    Ok(terminals)
}
