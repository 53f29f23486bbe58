//! This module contains errors pertaining to the search over execution paths.

use serde::Serialize;
use thiserror::Error;

use crate::{coverage::ProgramPoint, error::container, interface::Unimplemented};

/// Errors that occur during the search performed by the
/// [`crate::executor::SymbolicExecutor`].
#[derive(Clone, Debug, Eq, Error, PartialEq, Serialize)]
pub enum Error {
    #[error("The stepper has no semantics for {feature}")]
    Unimplemented { feature: String },

    #[error("Execution was stopped by the watchdog")]
    StoppedByWatchdog,
}

/// An execution error with an associated program point.
pub type LocatedError = container::Located<Error>;

/// A container of execution errors used for aggregation of errors during
/// execution.
pub type Errors = container::Errors<LocatedError>;

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

/// Unimplemented features reported by the stepper become located execution
/// errors, using the location the stepper reported.
impl From<Unimplemented> for LocatedError {
    fn from(value: Unimplemented) -> Self {
        let payload = Error::Unimplemented {
            feature: value.feature,
        };
        Self {
            location: value.location,
            payload,
        }
    }
}
