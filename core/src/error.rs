//! Domain error type raised when a startlist business rule is violated.

use thiserror::Error;

/// A business invariant was violated.
///
/// Raised synchronously by value-object factories and by every [`Startlist`]
/// operation. An operation that returns a `DomainError` has not mutated the
/// aggregate and has not recorded any event.
///
/// [`Startlist`]: crate::startlist::Startlist
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DomainError {
    message: String,
}

impl DomainError {
    /// Create a new domain error with a human-readable message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Convenience alias for results carrying a [`DomainError`].
pub type DomainResult<T> = Result<T, DomainError>;
