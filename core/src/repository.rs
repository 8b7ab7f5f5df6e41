//! Repository port for loading and saving startlist aggregates.
//!
//! The repository is the only place a command touches storage for the
//! aggregate itself. Safe concurrent access to the same startlist across
//! processes (locking, optimistic tokens) is the implementation's job; the
//! aggregate carries no concurrency token.

use crate::id::StartlistId;
use crate::startlist::Startlist;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during repository operations.
#[derive(Error, Debug, Clone)]
pub enum RepositoryError {
    /// Storage backend failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Stored state could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A concurrent writer changed the startlist first.
    #[error("Concurrent modification of startlist {0}")]
    Conflict(StartlistId),
}

/// Load/save port for [`Startlist`] aggregates.
///
/// # Dyn Compatibility
///
/// Methods return `Pin<Box<dyn Future>>` so the repository can be shared as
/// `Arc<dyn StartlistRepository>`.
pub trait StartlistRepository: Send + Sync {
    /// Load a startlist, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the backend fails or the stored state is
    /// unreadable.
    fn find_by_id(
        &self,
        id: &StartlistId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Startlist>, RepositoryError>> + Send + '_>>;

    /// Persist the current state of a startlist (insert or replace).
    ///
    /// Pending domain events are not part of the persisted state.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the state cannot be stored.
    fn save(
        &self,
        startlist: &Startlist,
    ) -> Pin<Box<dyn Future<Output = Result<(), RepositoryError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_error_names_the_startlist() {
        let error = RepositoryError::Conflict(StartlistId::new("sl-7"));
        assert!(error.to_string().contains("sl-7"));
    }
}
