//! # Startlist Runtime
//!
//! Command execution for the startlist aggregate.
//!
//! This crate provides the [`CommandOrchestrator`], the single execution shape
//! shared by every startlist use case: load (or create) one startlist, apply a
//! mutation inside a unit of work, persist it, then deliver the recorded events
//! after the commit.
//!
//! ## Core Components
//!
//! - **Orchestrator**: load-or-create, mutate, save, drain ([`orchestrator`])
//! - **Unit of work**: commit/rollback boundary supplied by the caller ([`transaction`])
//! - **Confirmation policy**: decides which transitions become audited versions
//! - **Configuration**: environment-driven settings ([`config`])
//! - **Metrics**: Prometheus counters and histograms ([`metrics`])
//!
//! ## Example
//!
//! ```ignore
//! use startlist_runtime::{CommandOrchestrator, RunOptions};
//!
//! let orchestrator = CommandOrchestrator::builder(repository, transactions, publisher)
//!     .version_repository(versions)
//!     .build();
//!
//! let snapshot = orchestrator
//!     .run(&id, |startlist| Ok(startlist.finalize_startlist()?), RunOptions::default())
//!     .await?;
//! ```
//!
//! ## Delivery guarantees
//!
//! Publishing and version persistence happen after the unit of work has
//! committed. A failure there is never rolled back and never retried: the
//! startlist state is durable while downstream consumers may miss the change.

/// Environment-driven orchestrator configuration
pub mod config;

/// Prometheus metrics for observability
pub mod metrics;

/// The command orchestrator, factories and confirmation policies
pub mod orchestrator;

/// Unit-of-work boundary
pub mod transaction;

pub use config::{ConfigError, OrchestratorConfig, PostCommitFailureMode};
pub use error::CommandError;
pub use orchestrator::{
    CommandOrchestrator, CommandOrchestratorBuilder, ConfirmOnFinalize, ConfirmationPolicy,
    CreationContext, DefaultStartlistFactory, NoConfirmation, RunOptions, StartlistFactory,
};
pub use transaction::{CommandOutcome, TransactionManager, UnitOfWork};

/// Error types for command execution
pub mod error {
    use startlist_core::error::DomainError;
    use startlist_core::id::StartlistId;
    use startlist_core::repository::RepositoryError;
    use thiserror::Error;

    /// Errors surfaced by [`CommandOrchestrator::run`](crate::CommandOrchestrator::run).
    ///
    /// Every failure a caller can observe is one of these variants. Errors
    /// raised inside a mutation closure that are already a `CommandError` pass
    /// through unchanged; a [`DomainError`] converts to
    /// [`CommandError::InvalidCommand`] through `?`.
    #[derive(Error, Debug)]
    pub enum CommandError {
        /// The startlist does not exist and creation was not requested
        #[error("Startlist {0} was not found")]
        NotFound(StartlistId),

        /// The command cannot be applied
        ///
        /// Either creation was requested without a factory or creation
        /// context, or the aggregate rejected the mutation.
        #[error("Invalid command: {0}")]
        InvalidCommand(String),

        /// Loading or saving the startlist failed
        ///
        /// The repository error is kept as the source and is not part of the
        /// message.
        #[error("Persistence failure: {message}")]
        Persistence {
            /// What the orchestrator was doing
            message: String,
            /// Underlying repository failure
            #[source]
            source: RepositoryError,
        },

        /// The transaction manager failed to commit or roll back
        #[error("Transaction failed: {0}")]
        Transaction(String),

        /// The state was committed, but publishing or version persistence failed
        ///
        /// Nothing is rolled back. Downstream consumers may have missed the change.
        #[error("Startlist {startlist_id} was committed, but post-commit delivery failed: {reason}")]
        DeliveryFailed {
            /// Startlist whose changes were committed
            startlist_id: StartlistId,
            /// Every delivery failure, joined
            reason: String,
        },
    }

    impl CommandError {
        /// Wrap a repository failure.
        #[must_use]
        pub fn persistence(message: impl Into<String>, source: RepositoryError) -> Self {
            Self::Persistence {
                message: message.into(),
                source,
            }
        }

        /// Metric label for this error kind.
        #[must_use]
        pub const fn outcome(&self) -> &'static str {
            match self {
                Self::NotFound(_) => "not_found",
                Self::InvalidCommand(_) => "invalid_command",
                Self::Persistence { .. } => "persistence",
                Self::Transaction(_) => "transaction",
                Self::DeliveryFailed { .. } => "delivery_failed",
            }
        }

        /// Whether the startlist state was durably committed despite this error.
        #[must_use]
        pub const fn is_committed(&self) -> bool {
            matches!(self, Self::DeliveryFailed { .. })
        }
    }

    impl From<DomainError> for CommandError {
        fn from(error: DomainError) -> Self {
            Self::InvalidCommand(error.message().to_string())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::error::Error as _;

        #[test]
        fn domain_error_becomes_invalid_command() {
            let error: CommandError =
                DomainError::new("No start times are assigned to invalidate.").into();
            assert!(matches!(
                &error,
                CommandError::InvalidCommand(message)
                    if message == "No start times are assigned to invalidate."
            ));
            assert_eq!(error.outcome(), "invalid_command");
        }

        #[test]
        fn persistence_keeps_source_out_of_message() {
            let error = CommandError::persistence(
                "Failed to save startlist sl-1",
                RepositoryError::DatabaseError("connection reset".to_string()),
            );
            assert_eq!(error.to_string(), "Persistence failure: Failed to save startlist sl-1");
            assert!(error.source().is_some());
            assert!(!error.is_committed());
        }

        #[test]
        fn delivery_failure_reports_commit() {
            let error = CommandError::DeliveryFailed {
                startlist_id: StartlistId::new("sl-1"),
                reason: "publish: broker down".to_string(),
            };
            assert!(error.is_committed());
            assert!(error.to_string().contains("was committed"));
        }
    }
}
