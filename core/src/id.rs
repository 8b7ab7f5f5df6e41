//! Startlist identification and confirmed-version numbering.

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of one startlist aggregate.
///
/// Opaque, non-empty, compared by value.
///
/// # Validation
///
/// - [`StartlistId::parse`], `FromStr`, `TryFrom` and `Deserialize` reject empty
///   or whitespace-only input. Use these for anything that crosses a process
///   boundary.
/// - [`StartlistId::new`]: no validation, for identifiers the application
///   already controls. The orchestrator still refuses to run a command
///   against a blank id.
///
/// # Examples
///
/// ```
/// use startlist_core::id::StartlistId;
///
/// let id = StartlistId::new("race-2025-spring");
/// assert_eq!(id.as_str(), "race-2025-spring");
///
/// let parsed: StartlistId = "race-2025-spring".parse().unwrap();
/// assert_eq!(parsed, id);
///
/// assert!("  ".parse::<StartlistId>().is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StartlistId(String);

impl StartlistId {
    /// Create a `StartlistId` without validation.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a `StartlistId`, rejecting empty input.
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] if `id` is empty or only whitespace.
    pub fn parse(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::new("Startlist id must not be empty."));
        }
        Ok(Self(id))
    }

    /// Whether the identifier is empty or only whitespace.
    ///
    /// Only possible for ids built with [`StartlistId::new`].
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert into the inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for StartlistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StartlistId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for StartlistId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for StartlistId {
    type Error = DomainError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<StartlistId> for String {
    fn from(id: StartlistId) -> Self {
        id.0
    }
}

impl AsRef<str> for StartlistId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Sequence number of a confirmed startlist version.
///
/// Versions are numbered per startlist: the first confirmation is version 1,
/// [`Version::INITIAL`] (0) means "nothing confirmed yet".
///
/// # Examples
///
/// ```
/// use startlist_core::id::Version;
///
/// let first = Version::INITIAL.next();
/// assert_eq!(first, Version::new(1));
/// assert_eq!(first.value(), 1);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// No version has been confirmed yet.
    pub const INITIAL: Self = Self(0);

    /// Create a new `Version` with the given value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the version number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Get the next version (current + 1).
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Check if this is the initial version (0).
    #[must_use]
    pub const fn is_initial(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Version {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Version> for u64 {
    fn from(version: Version) -> Self {
        version.0
    }
}
