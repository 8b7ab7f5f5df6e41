//! Unit-of-work boundary for command execution.
//!
//! The orchestrator hands the whole load → mutate → save → drain sequence to a
//! [`TransactionManager`] as one boxed future. The manager decides what
//! "commit" and "rollback" mean for its storage: a database transaction, a
//! lock, or a checkpoint of an in-memory map.

use crate::error::CommandError;
use futures::future::BoxFuture;
use startlist_core::event::StartlistEvent;
use startlist_core::startlist::StartlistSnapshot;

/// Result of one unit of work: the committed state and the events it recorded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Post-mutation state.
    pub snapshot: StartlistSnapshot,
    /// Drained domain events plus any version confirmations, in emission order.
    pub events: Vec<StartlistEvent>,
}

/// The work executed inside one transaction.
pub type UnitOfWork<'a> = BoxFuture<'a, Result<CommandOutcome, CommandError>>;

/// Runs a unit of work transactionally.
///
/// Implementations commit when the work resolves to `Ok` and roll back when it
/// resolves to `Err`. The work's result is returned unchanged unless the
/// commit or rollback itself fails, in which case
/// [`CommandError::Transaction`] is returned.
///
/// # Dyn Compatibility
///
/// Uses [`BoxFuture`] so managers can be shared as `Arc<dyn TransactionManager>`.
pub trait TransactionManager: Send + Sync {
    /// Execute `work` inside a transaction.
    ///
    /// # Errors
    ///
    /// Returns the work's error after rolling back, or
    /// [`CommandError::Transaction`] if committing or rolling back fails.
    fn execute<'a>(
        &'a self,
        work: UnitOfWork<'a>,
    ) -> BoxFuture<'a, Result<CommandOutcome, CommandError>>;
}
