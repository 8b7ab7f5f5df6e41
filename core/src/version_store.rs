//! Version repository port for confirmed startlist snapshots.
//!
//! A version is a timestamped snapshot taken at a confirmation point. Versions
//! are append-only and numbered per startlist; external read models use them
//! for audit and diffing.
//!
//! # Implementations
//!
//! - `InMemoryVersionRepository` (in `startlist-testing`): fast, deterministic tests
//!
//! # Example
//!
//! ```no_run
//! use startlist_core::id::StartlistId;
//! use startlist_core::version_store::{VersionQuery, VersionRepository, VersionStoreError};
//!
//! async fn latest<R: VersionRepository>(repo: &R) -> Result<(), VersionStoreError> {
//!     let query = VersionQuery::latest(StartlistId::new("sl-1"), 1);
//!     let versions = repo.find_versions(query).await?;
//!     if let Some(version) = versions.first() {
//!         println!("v{} confirmed at {}", version.version, version.confirmed_at);
//!     }
//!     Ok(())
//! }
//! ```

use crate::id::{StartlistId, Version};
use crate::startlist::StartlistSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during version store operations.
#[derive(Error, Debug, Clone)]
pub enum VersionStoreError {
    /// Storage backend failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Snapshot could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// A version to be stored; the store assigns the version number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVersionRecord {
    /// Startlist the snapshot belongs to.
    pub startlist_id: StartlistId,
    /// Confirmed state.
    pub snapshot: StartlistSnapshot,
    /// Confirmation instant.
    pub confirmed_at: DateTime<Utc>,
}

/// A stored, numbered version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    /// Startlist the snapshot belongs to.
    pub startlist_id: StartlistId,
    /// Per-startlist sequence number, starting at 1.
    pub version: Version,
    /// Confirmed state.
    pub snapshot: StartlistSnapshot,
    /// Confirmation instant.
    pub confirmed_at: DateTime<Utc>,
}

/// Filter for [`VersionRepository::find_versions`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionQuery {
    /// Startlist whose versions are requested.
    pub startlist_id: StartlistId,
    /// Maximum number of versions, newest first. `None` returns all.
    pub limit: Option<usize>,
}

impl VersionQuery {
    /// All versions of a startlist.
    #[must_use]
    pub const fn all(startlist_id: StartlistId) -> Self {
        Self {
            startlist_id,
            limit: None,
        }
    }

    /// The `limit` most recent versions of a startlist.
    #[must_use]
    pub const fn latest(startlist_id: StartlistId, limit: usize) -> Self {
        Self {
            startlist_id,
            limit: Some(limit),
        }
    }
}

/// Append-only store of confirmed startlist versions.
///
/// # Dyn Compatibility
///
/// Methods return `Pin<Box<dyn Future>>` so the repository can be shared as
/// `Arc<dyn VersionRepository>`.
pub trait VersionRepository: Send + Sync {
    /// Store a confirmed snapshot and assign it the next version number.
    ///
    /// # Errors
    ///
    /// Returns [`VersionStoreError`] if the record cannot be stored.
    fn save_version(
        &self,
        record: NewVersionRecord,
    ) -> Pin<Box<dyn Future<Output = Result<VersionRecord, VersionStoreError>> + Send + '_>>;

    /// Load versions of one startlist, newest first.
    ///
    /// Returns an empty vector for startlists that were never confirmed.
    ///
    /// # Errors
    ///
    /// Returns [`VersionStoreError`] if the store cannot be read.
    fn find_versions(
        &self,
        query: VersionQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<VersionRecord>, VersionStoreError>> + Send + '_>>;
}
