//! This module contains errors pertaining to parsing branch replay scripts.

use serde::Serialize;
use thiserror::Error;

/// Errors that occur when constructing a
/// [`crate::executor::policy::SelectedBranches`] policy from a script.
///
/// Positions are the 0-based index of the entry in the script.
#[derive(Clone, Debug, Eq, Error, PartialEq, Serialize)]
pub enum Error {
    #[error("The replay script contains no entries")]
    EmptyScript,

    #[error("Entry {position} of the replay script is empty")]
    EmptyEntry { position: usize },

    #[error("Entry {position} of the replay script ({entry:?}) is not a positive integer")]
    NotANumber { position: usize, entry: String },

    #[error("Entry {position} of the replay script is zero, but branch indices start at one")]
    ZeroIndex { position: usize },
}

/// The result type for methods that may have replay errors.
pub type Result<T> = std::result::Result<T, Error>;
