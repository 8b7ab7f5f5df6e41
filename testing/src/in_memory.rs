//! In-memory implementations of the startlist ports
//!
//! Provides fast, deterministic testing infrastructure for the orchestrator:
//! - [`InMemoryStartlistRepository`]: HashMap-based snapshot storage
//! - [`InMemoryVersionRepository`]: per-startlist version history
//! - [`InMemoryTransactionManager`]: checkpoint/restore unit of work
//! - [`RecordingEventPublisher`]: captures published batches
//!
//! Every collaborator supports failure injection so error paths can be tested
//! without a real database or broker.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Locks only panic if a test already panicked

use futures::future::BoxFuture;
use startlist_core::event::{SerializedEvent, StartlistEvent};
use startlist_core::event_bus::{EventPublisher, PublishError, STARTLIST_EVENTS_TOPIC};
use startlist_core::id::{StartlistId, Version};
use startlist_core::repository::{RepositoryError, StartlistRepository};
use startlist_core::startlist::{Startlist, StartlistSnapshot};
use startlist_core::version_store::{
    NewVersionRecord, VersionQuery, VersionRecord, VersionRepository, VersionStoreError,
};
use startlist_runtime::error::CommandError;
use startlist_runtime::transaction::{CommandOutcome, TransactionManager, UnitOfWork};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

// ============================================================================
// Startlist repository
// ============================================================================

/// Saved repository contents, used to roll back a unit of work.
#[derive(Clone, Debug, Default)]
pub struct RepositoryCheckpoint {
    snapshots: HashMap<StartlistId, StartlistSnapshot>,
}

/// In-memory startlist repository.
///
/// Stores snapshots and reconstitutes aggregates on load, so a loaded
/// startlist never shares state with the one that was saved.
///
/// # Example
///
/// ```
/// use startlist_testing::InMemoryStartlistRepository;
/// use startlist_core::repository::StartlistRepository;
/// use startlist_core::startlist::Startlist;
/// use startlist_core::id::StartlistId;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let repository = InMemoryStartlistRepository::new();
/// repository.save(&Startlist::create_new(StartlistId::new("sl-1"))).await?;
///
/// let loaded = repository.find_by_id(&StartlistId::new("sl-1")).await?;
/// assert!(loaded.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryStartlistRepository {
    snapshots: Arc<RwLock<HashMap<StartlistId, StartlistSnapshot>>>,
    fail_loads: Arc<AtomicBool>,
    fail_saves: Arc<AtomicBool>,
    saves: Arc<AtomicUsize>,
}

impl InMemoryStartlistRepository {
    /// Create a new empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `snapshot` directly, bypassing failure injection.
    pub fn insert(&self, snapshot: StartlistSnapshot) {
        self.snapshots
            .write()
            .unwrap()
            .insert(snapshot.id.clone(), snapshot);
    }

    /// Stored snapshot for `id`.
    #[must_use]
    pub fn get(&self, id: &StartlistId) -> Option<StartlistSnapshot> {
        self.snapshots.read().unwrap().get(id).cloned()
    }

    /// Number of stored startlists
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.read().unwrap().len()
    }

    /// Check if the repository is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.read().unwrap().is_empty()
    }

    /// Number of successful `save` calls.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make every subsequent `find_by_id` fail.
    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `save` fail.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Copy the current contents.
    #[must_use]
    pub fn checkpoint(&self) -> RepositoryCheckpoint {
        RepositoryCheckpoint {
            snapshots: self.snapshots.read().unwrap().clone(),
        }
    }

    /// Replace the contents with a checkpoint.
    pub fn restore(&self, checkpoint: RepositoryCheckpoint) {
        *self.snapshots.write().unwrap() = checkpoint.snapshots;
    }
}

impl StartlistRepository for InMemoryStartlistRepository {
    fn find_by_id(
        &self,
        id: &StartlistId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Startlist>, RepositoryError>> + Send + '_>> {
        let id = id.clone();
        Box::pin(async move {
            if self.fail_loads.load(Ordering::SeqCst) {
                return Err(RepositoryError::DatabaseError(
                    "injected load failure".to_string(),
                ));
            }
            Ok(self.get(&id).map(Startlist::reconstitute))
        })
    }

    fn save(
        &self,
        startlist: &Startlist,
    ) -> Pin<Box<dyn Future<Output = Result<(), RepositoryError>> + Send + '_>> {
        let snapshot = startlist.snapshot();
        Box::pin(async move {
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(RepositoryError::DatabaseError(
                    "injected save failure".to_string(),
                ));
            }
            self.insert(snapshot);
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

// ============================================================================
// Version repository
// ============================================================================

/// In-memory version repository.
///
/// Numbers versions per startlist starting at 1 and returns them newest first.
#[derive(Clone, Debug, Default)]
pub struct InMemoryVersionRepository {
    versions: Arc<RwLock<HashMap<StartlistId, Vec<VersionRecord>>>>,
    fail_saves: Arc<AtomicBool>,
}

impl InMemoryVersionRepository {
    /// Create a new empty version repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All versions of `id`, oldest first.
    #[must_use]
    pub fn versions(&self, id: &StartlistId) -> Vec<VersionRecord> {
        self.versions
            .read()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of stored versions across all startlists.
    #[must_use]
    pub fn len(&self) -> usize {
        self.versions.read().unwrap().values().map(Vec::len).sum()
    }

    /// Check if no version is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every subsequent `save_version` fail.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl VersionRepository for InMemoryVersionRepository {
    fn save_version(
        &self,
        record: NewVersionRecord,
    ) -> Pin<Box<dyn Future<Output = Result<VersionRecord, VersionStoreError>> + Send + '_>> {
        Box::pin(async move {
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(VersionStoreError::DatabaseError(
                    "injected version failure".to_string(),
                ));
            }
            let mut versions = self.versions.write().unwrap();
            let history = versions.entry(record.startlist_id.clone()).or_default();
            let version = history
                .last()
                .map_or(Version::INITIAL, |latest| latest.version)
                .next();
            let stored = VersionRecord {
                startlist_id: record.startlist_id,
                version,
                snapshot: record.snapshot,
                confirmed_at: record.confirmed_at,
            };
            history.push(stored.clone());
            Ok(stored)
        })
    }

    fn find_versions(
        &self,
        query: VersionQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<VersionRecord>, VersionStoreError>> + Send + '_>>
    {
        Box::pin(async move {
            let newest_first = self.versions(&query.startlist_id).into_iter().rev();
            Ok(match query.limit {
                Some(limit) => newest_first.take(limit).collect(),
                None => newest_first.collect(),
            })
        })
    }
}

// ============================================================================
// Transaction manager
// ============================================================================

/// Transaction manager over an [`InMemoryStartlistRepository`].
///
/// Takes a checkpoint before running the work and restores it when the work
/// fails. Units of work are serialized so a rollback never discards another
/// transaction's writes.
#[derive(Clone, Debug)]
pub struct InMemoryTransactionManager {
    repository: InMemoryStartlistRepository,
    lock: Arc<tokio::sync::Mutex<()>>,
    commits: Arc<AtomicUsize>,
    rollbacks: Arc<AtomicUsize>,
    fail_commits: Arc<AtomicBool>,
}

impl InMemoryTransactionManager {
    /// Create a manager guarding `repository`.
    #[must_use]
    pub fn new(repository: InMemoryStartlistRepository) -> Self {
        Self {
            repository,
            lock: Arc::new(tokio::sync::Mutex::new(())),
            commits: Arc::new(AtomicUsize::new(0)),
            rollbacks: Arc::new(AtomicUsize::new(0)),
            fail_commits: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Number of committed units of work.
    #[must_use]
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Number of rolled back units of work.
    #[must_use]
    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    /// Make every subsequent commit fail (and roll back instead).
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }
}

impl TransactionManager for InMemoryTransactionManager {
    fn execute<'a>(
        &'a self,
        work: UnitOfWork<'a>,
    ) -> BoxFuture<'a, Result<CommandOutcome, CommandError>> {
        Box::pin(async move {
            let _guard = self.lock.lock().await;
            let checkpoint = self.repository.checkpoint();

            match work.await {
                Ok(_) if self.fail_commits.load(Ordering::SeqCst) => {
                    self.repository.restore(checkpoint);
                    self.rollbacks.fetch_add(1, Ordering::SeqCst);
                    Err(CommandError::Transaction("injected commit failure".to_string()))
                }
                Ok(outcome) => {
                    self.commits.fetch_add(1, Ordering::SeqCst);
                    Ok(outcome)
                }
                Err(error) => {
                    self.repository.restore(checkpoint);
                    self.rollbacks.fetch_add(1, Ordering::SeqCst);
                    tracing::debug!(error = %error, "Unit of work rolled back");
                    Err(error)
                }
            }
        })
    }
}

// ============================================================================
// Event publisher
// ============================================================================

/// Event publisher that records every published batch.
#[derive(Clone, Debug, Default)]
pub struct RecordingEventPublisher {
    batches: Arc<RwLock<Vec<Vec<StartlistEvent>>>>,
    envelopes: Arc<RwLock<Vec<SerializedEvent>>>,
    fail_publishes: Arc<AtomicBool>,
    attempts: Arc<AtomicUsize>,
}

impl RecordingEventPublisher {
    /// Create a new publisher with nothing recorded
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every successfully published batch, in order.
    #[must_use]
    pub fn batches(&self) -> Vec<Vec<StartlistEvent>> {
        self.batches.read().unwrap().clone()
    }

    /// All published events, flattened.
    #[must_use]
    pub fn events(&self) -> Vec<StartlistEvent> {
        self.batches.read().unwrap().iter().flatten().cloned().collect()
    }

    /// Type names of all published events.
    #[must_use]
    pub fn event_types(&self) -> Vec<&'static str> {
        use startlist_core::event::Event as _;
        self.events().iter().map(|event| event.event_type()).collect()
    }

    /// All published events in the wire envelope they were encoded into.
    #[must_use]
    pub fn serialized(&self) -> Vec<SerializedEvent> {
        self.envelopes.read().unwrap().clone()
    }

    /// Number of `publish` calls, including failed ones.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Make every subsequent `publish` fail.
    pub fn fail_publishes(&self, fail: bool) {
        self.fail_publishes.store(fail, Ordering::SeqCst);
    }
}

impl EventPublisher for RecordingEventPublisher {
    fn publish(
        &self,
        events: &[StartlistEvent],
    ) -> Pin<Box<dyn Future<Output = Result<(), PublishError>> + Send + '_>> {
        let events = events.to_vec();
        Box::pin(async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail_publishes.load(Ordering::SeqCst) {
                return Err(PublishError::PublishFailed {
                    topic: STARTLIST_EVENTS_TOPIC.to_string(),
                    reason: "injected publish failure".to_string(),
                });
            }
            let envelopes = events
                .iter()
                .map(StartlistEvent::to_serialized)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|error| PublishError::SerializationFailed(error.to_string()))?;
            self.envelopes.write().unwrap().extend(envelopes);
            self.batches.write().unwrap().push(events);
            Ok(())
        })
    }
}
