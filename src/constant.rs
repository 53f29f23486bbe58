//! This module contains constants that are needed throughout the codebase.

/// The default maximum number of tests that a single run will produce before
/// stopping.
///
/// A value of zero means that the number of tests is unbounded, and the run
/// only ends when the search space is exhausted or the completion callback
/// asks for it to stop.
pub const DEFAULT_MAX_TESTS: usize = 0;

/// The default value for whether the executor runs in strict mode.
///
/// In strict mode, an unimplemented language feature encountered by the
/// stepper aborts the whole run rather than just the current path. See
/// [`crate::executor::Config`] for more information on what this entails.
pub const DEFAULT_STRICT_MODE_ENABLED: bool = false;

/// The default number of multi-way branching steps the greedy policies will
/// take without producing a test before they stop scanning for coverage gain
/// and fall back to random choice.
///
/// Cyclic regions of a program (parser loops being the common case) can keep
/// offering "new" points forever, so this bounds the greedy phase.
pub const DEFAULT_MAX_STEPS_WITHOUT_TEST: usize = 10;

/// The default value for whether a run stops once the coverage tracker's
/// known universe of program points is fully covered.
pub const DEFAULT_STOP_ON_FULL_COVERAGE: bool = false;

/// The default number of loop iterations the executor will wait before polling
/// the watchdog.
pub const DEFAULT_WATCHDOG_POLL_LOOP_ITERATIONS: usize = 100;

/// The separator between entries of a branch replay script.
pub const REPLAY_SCRIPT_SEPARATOR: char = ',';
