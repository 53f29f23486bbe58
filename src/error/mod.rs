//! This module contains the primary error type for the search engine's
//! interface. It also re-exports the more specific error types that are
//! subsystem-specific.

pub mod container;
pub mod execution;
pub mod replay;

use serde::Serialize;
use thiserror::Error;

use crate::coverage::ProgramPoint;

/// The interface result type for the library.
///
/// # Usage
///
/// Any function considered to be part of the public interface of the library
/// should return this result type. Subsystems should return the more-specific
/// child error types as appropriate.
pub type Result<T> = std::result::Result<T, LocatedError>;

/// The interface error type for the library.
///
/// All errors returned from the library interface (and hence encountered by the
/// clients of the library) should be members of this enum.
#[derive(Clone, Debug, Eq, Error, PartialEq, Serialize)]
pub enum Error {
    /// Errors from the search itself.
    #[error(transparent)]
    Execution(#[from] execution::Error),

    /// Errors from parsing a replay script.
    #[error(transparent)]
    Replay(#[from] replay::Error),
}

/// Make it possible to attach locations to these errors.
impl container::Locatable for Error {
    type Located = LocatedError;

    fn locate(self, location: Option<ProgramPoint>) -> Self::Located {
        container::Located {
            location,
            payload: self,
        }
    }
}

/// A library error with an associated program point.
pub type LocatedError = container::Located<Error>;

/// A container of errors that may occur in the library.
pub type Errors = container::Errors<LocatedError>;

/// Allow simple conversions from located execution errors by re-wrapping the
/// located error around the more general payload.
impl From<execution::LocatedError> for LocatedError {
    fn from(value: execution::LocatedError) -> Self {
        let location = value.location;
        let payload = Error::from(value.payload);
        Self { location, payload }
    }
}

/// Replay scripts are not tied to any point in the program, so their errors
/// are wrapped without a location.
impl From<replay::Error> for LocatedError {
    fn from(value: replay::Error) -> Self {
        let location = None;
        let payload = Error::from(value);
        Self { location, payload }
    }
}

/// Allow conversion from the execution errors container to the general errors
/// container.
impl From<execution::Errors> for Errors {
    fn from(value: execution::Errors) -> Self {
        let errs: Vec<execution::LocatedError> = value.into();
        let new_errs: Vec<LocatedError> = errs.into_iter().map(std::convert::Into::into).collect();

        new_errs.into()
    }
}
