//! This module contains the types used to track which program points have been
//! covered, both along a single path and globally across every accepted test.

use std::fmt::{Display, Formatter};

use im::{ordset, OrdSet};
use serde::{Deserialize, Serialize};

/// The kind of location that a [`ProgramPoint`] identifies.
///
/// Coverage can be measured at either granularity. Every point counts towards
/// node coverage, while only [`PointKind::Statement`] points count towards
/// statement coverage.
#[derive(Copy, Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum PointKind {
    /// Any node in the compiled program, such as a table, an action or a
    /// parser state.
    Node,

    /// An executable statement.
    Statement,
}

/// An opaque identifier for a single location in the compiled program.
///
/// Program points are created once when the program is compiled and are never
/// destroyed. They are totally ordered by their identifier first and their kind
/// second.
#[derive(Copy, Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ProgramPoint {
    id:   u32,
    kind: PointKind,
}

impl ProgramPoint {
    /// Constructs a new program point with the provided `id` and `kind`.
    #[must_use]
    pub fn new(id: u32, kind: PointKind) -> Self {
        Self { id, kind }
    }

    /// Constructs a new node-granularity program point with the provided `id`.
    #[must_use]
    pub fn node(id: u32) -> Self {
        Self::new(id, PointKind::Node)
    }

    /// Constructs a new statement program point with the provided `id`.
    #[must_use]
    pub fn statement(id: u32) -> Self {
        Self::new(id, PointKind::Statement)
    }

    /// Gets the identifier of the program point.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Gets the kind of the program point.
    #[must_use]
    pub fn kind(&self) -> PointKind {
        self.kind
    }

    /// Checks if the program point is a statement.
    #[must_use]
    pub fn is_statement(&self) -> bool {
        self.kind == PointKind::Statement
    }
}

impl Display for ProgramPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            PointKind::Node => write!(f, "node#{}", self.id),
            PointKind::Statement => write!(f, "stmt#{}", self.id),
        }
    }
}

/// A monotonically growing set of program points.
///
/// Points are only ever added to a coverage set, never removed, and iteration
/// always proceeds in the total order of [`ProgramPoint`].
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct CoverageSet {
    points: OrdSet<ProgramPoint>,
}

impl CoverageSet {
    /// Creates a new, empty, coverage set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `point` into the set, returning `true` if it was not already
    /// present.
    pub fn insert(&mut self, point: ProgramPoint) -> bool {
        self.points.insert(point).is_none()
    }

    /// Checks if the set contains `point`.
    #[must_use]
    pub fn contains(&self, point: &ProgramPoint) -> bool {
        self.points.contains(point)
    }

    /// Gets the number of points in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Checks if the set contains no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Adds every point in `other` to `self`, returning `true` if at least one
    /// of them was not already present.
    pub fn union(&mut self, other: &CoverageSet) -> bool {
        other
            .iter()
            .fold(false, |added, point| self.insert(*point) || added)
    }

    /// Iterates over the points in the set in ascending order.
    pub fn iter(&self) -> ordset::Iter<'_, ProgramPoint> {
        self.points.iter()
    }
}

impl FromIterator<ProgramPoint> for CoverageSet {
    fn from_iter<T: IntoIterator<Item = ProgramPoint>>(iter: T) -> Self {
        let points = iter.into_iter().collect();
        Self { points }
    }
}

impl Extend<ProgramPoint> for CoverageSet {
    fn extend<T: IntoIterator<Item = ProgramPoint>>(&mut self, iter: T) {
        self.points.extend(iter);
    }
}

impl<'a> IntoIterator for &'a CoverageSet {
    type IntoIter = ordset::Iter<'a, ProgramPoint>;
    type Item = &'a ProgramPoint;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for CoverageSet {
    type IntoIter = ordset::ConsumingIter<ProgramPoint>;
    type Item = ProgramPoint;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}

/// The global record of every program point that has been confirmed as covered
/// by an accepted test.
///
/// Only the executor writes to the tracker, and only once a terminal state has
/// been handed to the completion callback. Selection policies read it to decide
/// whether a branch might cover something new.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CoverageTracker {
    /// The points that have been covered so far.
    covered: CoverageSet,

    /// Every point in the program, if known.
    universe: Option<CoverageSet>,
}

impl CoverageTracker {
    /// Creates a new tracker that has not covered anything and has no
    /// knowledge of the full set of points in the program.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new tracker that knows the full set of program points is
    /// `universe`, allowing it to report coverage percentages and completion.
    ///
    /// An empty `universe` is treated as unknown, so the resulting tracker
    /// never reports itself as complete.
    #[must_use]
    pub fn with_universe(universe: impl IntoIterator<Item = ProgramPoint>) -> Self {
        let covered = CoverageSet::new();
        let universe: CoverageSet = universe.into_iter().collect();
        let universe = (!universe.is_empty()).then_some(universe);
        Self { covered, universe }
    }

    /// Merges `points` into the global coverage, returning `true` if any of
    /// them was not previously covered.
    pub fn mark(&mut self, points: &CoverageSet) -> bool {
        self.covered.union(points)
    }

    /// Checks if `point` has been covered.
    #[must_use]
    pub fn is_covered(&self, point: &ProgramPoint) -> bool {
        self.covered.contains(point)
    }

    /// Gets the number of points that have been covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.covered.len()
    }

    /// Checks if nothing has been covered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.covered.is_empty()
    }

    /// Gets a read-only view of the covered points.
    #[must_use]
    pub fn covered(&self) -> &CoverageSet {
        &self.covered
    }

    /// Takes a copy of the covered points for reporting.
    #[must_use]
    pub fn snapshot(&self) -> CoverageSet {
        self.covered.clone()
    }

    /// Gets the full set of program points, if known.
    #[must_use]
    pub fn universe(&self) -> Option<&CoverageSet> {
        self.universe.as_ref()
    }

    /// Checks if every point in the universe has been covered.
    ///
    /// A tracker without a universe, or with an empty one, is never complete.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.universe
            .as_ref()
            .is_some_and(|universe| universe.iter().all(|p| self.covered.contains(p)))
    }

    /// Generates a report describing the current coverage.
    #[must_use]
    pub fn report(&self) -> CoverageReport {
        let (total, uncovered) = match &self.universe {
            Some(universe) => {
                let uncovered: Vec<ProgramPoint> = universe
                    .iter()
                    .filter(|p| !self.covered.contains(p))
                    .copied()
                    .collect();
                (Some(universe.len()), uncovered)
            }
            None => (None, Vec::new()),
        };
        let covered = match total {
            Some(total) => total - uncovered.len(),
            None => self.covered.len(),
        };

        CoverageReport {
            covered,
            total,
            uncovered,
        }
    }
}

/// A summary of the coverage achieved by a run.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CoverageReport {
    /// The number of covered points.
    ///
    /// If the universe is known, only points within it are counted.
    pub covered: usize,

    /// The total number of points in the program, if known.
    pub total: Option<usize>,

    /// The points in the universe that have not been covered, in ascending
    /// order.
    pub uncovered: Vec<ProgramPoint>,
}

impl CoverageReport {
    /// Gets the percentage of the program that has been covered, if the total
    /// is known.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Point counts are far below 2^52
    pub fn percentage(&self) -> Option<f64> {
        self.total.map(|total| {
            if total == 0 {
                100.0
            } else {
                self.covered as f64 * 100.0 / total as f64
            }
        })
    }
}

impl Display for CoverageReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (self.total, self.percentage()) {
            (Some(total), Some(percentage)) => write!(
                f,
                "Covered {}/{} program points ({percentage:.2}%)",
                self.covered, total
            ),
            _ => write!(f, "Covered {} program points", self.covered),
        }
    }
}
