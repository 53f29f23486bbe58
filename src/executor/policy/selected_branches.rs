//! This module contains the deterministic replay policy, which follows a
//! recorded sequence of branch decisions.
//!
//! # Replay Scripts
//!
//! A replay script is a comma-separated list of positive integers, such as
//! `"1,2,5"`. Each entry is the 1-based position, within the batch produced by
//! the stepper, of the branch to take at the next branching point. Points where
//! the stepper produces a single successor are not branching points and do not
//! consume an entry.
//!
//! The script for any terminal state can be obtained from
//! [`crate::state::ExecutionState::replay_script`].

use std::{
    collections::VecDeque,
    fmt::{Display, Formatter},
};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    branch::Branch,
    constant::REPLAY_SCRIPT_SEPARATOR,
    error::replay::{Error, Result},
    executor::policy::{backlog::Pending, PolicyContext},
    state::StateRef,
};

/// The ways in which a replay can fail to follow its script.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ReplayMismatch {
    /// A branching point was reached after every entry had been used.
    ScriptExhausted { consumed: usize },

    /// The script asked for a branch that the stepper did not offer.
    NoMatchingBranch { index: usize, offered: usize },

    /// The branch the script asked for has an infeasible path condition.
    Infeasible { index: usize },
}

impl Display for ReplayMismatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ScriptExhausted { consumed } => write!(
                f,
                "the replay script ran out after {consumed} entries before the path ended"
            ),
            Self::NoMatchingBranch { index, offered } => write!(
                f,
                "the replay script selected branch {index} but only {offered} were offered"
            ),
            Self::Infeasible { index } => {
                write!(f, "the replay script selected branch {index}, which is infeasible")
            }
        }
    }
}

/// A policy that replays a fixed sequence of branch decisions.
///
/// It never stores passed-over branches, so it explores exactly one path and
/// never resumes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SelectedBranches {
    /// The indices that have not been used yet.
    remaining: VecDeque<usize>,

    /// The number of indices that have been used.
    consumed: usize,

    /// The reason the replay stopped following its script, if it did.
    mismatch: Option<ReplayMismatch>,
}

impl SelectedBranches {
    /// Creates a new replay policy that follows `indices`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `indices` is empty or any of the indices is zero.
    pub fn new(indices: impl IntoIterator<Item = usize>) -> Result<Self> {
        let remaining: VecDeque<usize> = indices.into_iter().collect();
        if remaining.is_empty() {
            return Err(Error::EmptyScript);
        }
        if let Some(position) = remaining.iter().position(|index| *index == 0) {
            return Err(Error::ZeroIndex { position });
        }

        Ok(Self {
            remaining,
            consumed: 0,
            mismatch: None,
        })
    }

    /// Parses `script`, a comma-separated list of positive integers, into a
    /// replay policy.
    ///
    /// Whitespace around entries is ignored. Every entry must consist of ASCII
    /// digits only, so signs are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the script is empty, or if any entry is empty, not an
    /// integer, or zero.
    pub fn from_script(script: &str) -> Result<Self> {
        if script.trim().is_empty() {
            return Err(Error::EmptyScript);
        }

        let indices = script
            .split(REPLAY_SCRIPT_SEPARATOR)
            .map(str::trim)
            .enumerate()
            .map(|(position, entry)| {
                if entry.is_empty() {
                    return Err(Error::EmptyEntry { position });
                }
                let not_a_number = || Error::NotANumber {
                    position,
                    entry: entry.to_string(),
                };
                if !entry.chars().all(|c| c.is_ascii_digit()) {
                    return Err(not_a_number());
                }
                entry.parse::<usize>().map_err(|_| not_a_number())
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(indices)
    }

    /// Gets the indices that have not been used yet.
    #[must_use]
    pub fn remaining(&self) -> &VecDeque<usize> {
        &self.remaining
    }

    /// Gets the reason the replay stopped following its script, if it did.
    #[must_use]
    pub fn mismatch(&self) -> Option<&ReplayMismatch> {
        self.mismatch.as_ref()
    }

    /// Takes the branch the script asks for at this branching point.
    ///
    /// The chosen branch is the one whose decision trail, once extended with its
    /// position in this batch, ends in the scripted index.
    pub(super) fn pick(
        &mut self,
        batch: Vec<Branch>,
        context: &mut PolicyContext<'_>,
    ) -> Option<StateRef> {
        let Some(index) = self.remaining.pop_front() else {
            return self.abandon(ReplayMismatch::ScriptExhausted {
                consumed: self.consumed,
            });
        };
        self.consumed += 1;

        let offered = batch.len();
        let Some(chosen) = Pending::number(batch)
            .into_iter()
            .find(|candidate| candidate.ordinal() == index)
        else {
            return self.abandon(ReplayMismatch::NoMatchingBranch { index, offered });
        };

        if !context.is_feasible(chosen.branch().state()) {
            return self.abandon(ReplayMismatch::Infeasible { index });
        }

        Some(chosen.adopt())
    }

    /// Records that the replay could not continue.
    fn abandon(&mut self, mismatch: ReplayMismatch) -> Option<StateRef> {
        warn!(%mismatch, "Abandoning replay");
        self.mismatch = Some(mismatch);
        None
    }
}
