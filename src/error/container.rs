use std::fmt::Formatter;

use serde::Serialize;
use thiserror::Error;

use crate::coverage::ProgramPoint;

/// An error that is localised to a particular point in the program being
/// searched.
#[derive(Clone, Debug, Eq, Error, PartialEq, Serialize)]
pub struct Located<E>
where
    E: Clone,
{
    /// The program point at which the error occurred, if known.
    pub location: Option<ProgramPoint>,

    /// The error data
    pub payload: E,
}

/// Displays the error alongside the program point where it occurred.
impl<E> std::fmt::Display for Located<E>
where
    E: std::fmt::Display + Clone,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(location) => write!(f, "[{location}]: {}", self.payload),
            None => write!(f, "[unknown]: {}", self.payload),
        }
    }
}

/// A trait for types that can have a program location attached to them.
pub trait Locatable
where
    Self: Sized,
{
    /// The return type with the attached location.
    type Located;

    /// Attach the program point described by `location` to the error.
    fn locate(self, location: Option<ProgramPoint>) -> Self::Located;
}

/// A blanket implementation that allows for attaching a location to any result.
impl<T, E> Locatable for Result<T, E>
where
    E: std::error::Error + Clone,
{
    type Located = Result<T, Located<E>>;

    fn locate(self, location: Option<ProgramPoint>) -> Self::Located {
        self.map_err(|e| Located {
            location,
            payload: e,
        })
    }
}

/// An error that is a collection of errors.
///
/// The order of the errors in the container is dependent on the contained type
/// `E`. It serializes as a plain sequence of its errors.
#[derive(Clone, Debug, Eq, Error, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Errors<E> {
    payloads: Vec<E>,
}

impl<E> Errors<E> {
    /// Creates a new container for errors.
    #[must_use]
    pub fn new() -> Self {
        let payloads = vec![];
        Self { payloads }
    }

    /// Gets the errors contained within this error.
    #[must_use]
    pub fn payloads(&self) -> &[E] {
        self.payloads.as_slice()
    }

    /// Gets the length of the errors container.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    /// Checks if the errors container is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where the locations are a known type, the container keeps the errors sorted
/// in program point order, with unlocated errors first.
impl<E> Errors<Located<E>>
where
    E: std::error::Error + Clone,
{
    /// Adds an error `payload` at the specific program `location`.
    pub fn add_located(&mut self, location: Option<ProgramPoint>, payload: E) {
        let error = Located { location, payload };
        self.payloads.push(error);
        self.sort();
    }

    /// Sorts the errors based on their program location.
    ///
    /// The sort is stable, so errors at the same location keep the order in
    /// which they were encountered.
    fn sort(&mut self) {
        self.payloads.sort_by_key(|item| item.location);
    }
}

/// The default errors container is one containing no errors.
impl<E> Default for Errors<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Allow conversion from the errors container to a vector of errors.
impl<E> From<Errors<E>> for Vec<E>
where
    E: std::error::Error,
{
    fn from(value: Errors<E>) -> Self {
        value.payloads
    }
}

/// Allow conversion from a vector of errors to the errors container.
impl<E> From<Vec<E>> for Errors<E>
where
    E: std::error::Error,
{
    fn from(value: Vec<E>) -> Self {
        Self { payloads: value }
    }
}

/// Displays the errors in the sequence in which they occur in the container.
///
/// It has a header specifying how many errors occurred, and then prints one
/// error per line after that.
impl<E> std::fmt::Display for Errors<E>
where
    E: std::fmt::Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.payloads.is_empty() {
            write!(f, "Encountered no errors")?;
        } else {
            writeln!(f, "Encountered {} errors:", self.payloads.len())?;
            for error in &self.payloads {
                writeln!(f, "{error}")?;
            }
        }

        Ok(())
    }
}
