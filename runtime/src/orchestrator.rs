//! The command orchestrator.
//!
//! Every startlist use case runs through [`CommandOrchestrator::run`]:
//!
//! 1. Inside the unit of work: load the startlist (or create it through the
//!    factory), apply the mutation, save, drain events, append version
//!    confirmations, capture the snapshot.
//! 2. After the commit: publish the events (skipped when there are none), then
//!    persist every version confirmation.
//!
//! Step 2 is not covered by the transaction. Both halves are always attempted;
//! failures are either propagated as [`CommandError::DeliveryFailed`] or logged,
//! depending on [`PostCommitFailureMode`].

use crate::config::{OrchestratorConfig, PostCommitFailureMode};
use crate::error::CommandError;
use crate::metrics::{CommandMetrics, DeliveryMetrics};
use crate::transaction::{CommandOutcome, TransactionManager};
use chrono::{DateTime, Utc};
use startlist_core::environment::{Clock, SystemClock};
use startlist_core::event::StartlistEvent;
use startlist_core::event_bus::EventPublisher;
use startlist_core::id::StartlistId;
use startlist_core::repository::StartlistRepository;
use startlist_core::startlist::{Startlist, StartlistSnapshot};
use startlist_core::version_store::VersionRepository;
use std::sync::Arc;
use std::time::Instant;

// ============================================================================
// Creation
// ============================================================================

/// Who is creating a startlist, and for which event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreationContext {
    /// Event the new startlist belongs to.
    pub event_id: String,
    /// Actor requesting the creation, for audit logs.
    pub requested_by: Option<String>,
}

impl CreationContext {
    /// Context for `event_id` with no recorded actor.
    #[must_use]
    pub fn new(event_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            requested_by: None,
        }
    }

    /// Record the requesting actor.
    #[must_use]
    pub fn requested_by(mut self, actor: impl Into<String>) -> Self {
        self.requested_by = Some(actor.into());
        self
    }
}

/// Builds new startlist aggregates when a command is allowed to create one.
pub trait StartlistFactory: Send + Sync {
    /// Create a new, unsaved startlist.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidCommand`] if the context is unusable.
    fn create(&self, id: &StartlistId, context: &CreationContext)
    -> Result<Startlist, CommandError>;
}

/// Creates empty draft startlists.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultStartlistFactory;

impl StartlistFactory for DefaultStartlistFactory {
    fn create(
        &self,
        id: &StartlistId,
        context: &CreationContext,
    ) -> Result<Startlist, CommandError> {
        if context.event_id.trim().is_empty() {
            return Err(CommandError::InvalidCommand(
                "Creation context must name an event.".to_string(),
            ));
        }
        tracing::info!(
            startlist_id = %id,
            event_id = %context.event_id,
            requested_by = context.requested_by.as_deref().unwrap_or("unknown"),
            "Creating startlist"
        );
        Ok(Startlist::create_new(id.clone()))
    }
}

/// Per-call options for [`CommandOrchestrator::run`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Create the startlist if it does not exist.
    pub allow_create: bool,
    /// Passed to the factory when creating.
    pub create_context: Option<CreationContext>,
}

impl RunOptions {
    /// Options that allow creating the startlist with `context`.
    #[must_use]
    pub const fn create(context: CreationContext) -> Self {
        Self {
            allow_create: true,
            create_context: Some(context),
        }
    }
}

// ============================================================================
// Confirmation policies
// ============================================================================

/// Decides which drained events produce a confirmed version.
pub trait ConfirmationPolicy: Send + Sync {
    /// Version-confirmation events to append after `events`.
    fn confirmations(
        &self,
        events: &[StartlistEvent],
        confirmed_at: DateTime<Utc>,
    ) -> Vec<StartlistEvent>;
}

/// Confirms a version for every finalization.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConfirmOnFinalize;

impl ConfirmationPolicy for ConfirmOnFinalize {
    fn confirmations(
        &self,
        events: &[StartlistEvent],
        confirmed_at: DateTime<Utc>,
    ) -> Vec<StartlistEvent> {
        events
            .iter()
            .filter_map(|event| match event {
                StartlistEvent::Finalized {
                    startlist_id,
                    snapshot,
                    ..
                } => Some(StartlistEvent::VersionConfirmed {
                    startlist_id: startlist_id.clone(),
                    snapshot: snapshot.clone(),
                    confirmed_at,
                    occurred_at: confirmed_at,
                }),
                _ => None,
            })
            .collect()
    }
}

/// Never confirms versions.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoConfirmation;

impl ConfirmationPolicy for NoConfirmation {
    fn confirmations(&self, _: &[StartlistEvent], _: DateTime<Utc>) -> Vec<StartlistEvent> {
        Vec::new()
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Runs commands against one startlist inside a unit of work.
///
/// Cheap to share behind an `Arc`; all collaborators are trait objects.
pub struct CommandOrchestrator {
    repository: Arc<dyn StartlistRepository>,
    transaction_manager: Arc<dyn TransactionManager>,
    publisher: Arc<dyn EventPublisher>,
    version_repository: Option<Arc<dyn VersionRepository>>,
    factory: Option<Arc<dyn StartlistFactory>>,
    confirmation_policy: Arc<dyn ConfirmationPolicy>,
    clock: Arc<dyn Clock>,
    config: OrchestratorConfig,
}

impl CommandOrchestrator {
    /// Start building an orchestrator from its required collaborators.
    #[must_use]
    pub fn builder(
        repository: Arc<dyn StartlistRepository>,
        transaction_manager: Arc<dyn TransactionManager>,
        publisher: Arc<dyn EventPublisher>,
    ) -> CommandOrchestratorBuilder {
        CommandOrchestratorBuilder {
            repository,
            transaction_manager,
            publisher,
            version_repository: None,
            factory: None,
            confirmation_policy: None,
            clock: None,
            config: OrchestratorConfig::default(),
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Load or create startlist `id`, apply `mutate`, persist, and deliver events.
    ///
    /// `mutate` may return any [`CommandError`]; a
    /// [`DomainError`](startlist_core::error::DomainError) propagated with `?`
    /// becomes [`CommandError::InvalidCommand`].
    ///
    /// # Errors
    ///
    /// - [`CommandError::NotFound`] if the startlist is absent and creation is not allowed
    /// - [`CommandError::InvalidCommand`] if `id` is blank, creation lacks a factory or
    ///   context, or the mutation is rejected
    /// - [`CommandError::Persistence`] if loading or saving fails
    /// - [`CommandError::Transaction`] if the transaction manager fails
    /// - [`CommandError::DeliveryFailed`] if post-commit delivery fails and the
    ///   failure mode is [`PostCommitFailureMode::Propagate`]
    #[tracing::instrument(
        skip(self, id, mutate, options),
        name = "startlist_command",
        fields(startlist_id = %id, allow_create = options.allow_create)
    )]
    pub async fn run<F>(
        &self,
        id: &StartlistId,
        mutate: F,
        options: RunOptions,
    ) -> Result<StartlistSnapshot, CommandError>
    where
        F: FnOnce(&mut Startlist) -> Result<(), CommandError> + Send,
    {
        let started = Instant::now();
        let result = self.run_command(id, mutate, options).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(error) => error.outcome(),
        };
        CommandMetrics::record(outcome, started.elapsed());
        match &result {
            Ok(snapshot) => tracing::debug!(status = %snapshot.status, "Command completed"),
            Err(error) => tracing::debug!(error = %error, "Command failed"),
        }
        result
    }

    async fn run_command<F>(
        &self,
        id: &StartlistId,
        mutate: F,
        options: RunOptions,
    ) -> Result<StartlistSnapshot, CommandError>
    where
        F: FnOnce(&mut Startlist) -> Result<(), CommandError> + Send,
    {
        if id.is_blank() {
            return Err(CommandError::InvalidCommand(
                "Startlist id must not be empty.".to_string(),
            ));
        }

        let work = Box::pin(self.unit_of_work(id.clone(), mutate, options));
        let CommandOutcome { snapshot, events } = self.transaction_manager.execute(work).await?;

        self.deliver(&snapshot.id, &events).await?;
        Ok(snapshot)
    }

    async fn unit_of_work<F>(
        &self,
        id: StartlistId,
        mutate: F,
        options: RunOptions,
    ) -> Result<CommandOutcome, CommandError>
    where
        F: FnOnce(&mut Startlist) -> Result<(), CommandError> + Send,
    {
        let mut startlist = self
            .load_or_create(&id, &options)
            .await?
            .with_clock(Arc::clone(&self.clock));

        mutate(&mut startlist)?;

        self.repository
            .save(&startlist)
            .await
            .map_err(|source| {
                CommandError::persistence(format!("Failed to save startlist {id}"), source)
            })?;

        let mut events = startlist.pull_domain_events();
        let confirmations = self
            .confirmation_policy
            .confirmations(&events, self.clock.now());
        events.extend(confirmations);

        Ok(CommandOutcome {
            snapshot: startlist.snapshot(),
            events,
        })
    }

    async fn load_or_create(
        &self,
        id: &StartlistId,
        options: &RunOptions,
    ) -> Result<Startlist, CommandError> {
        let existing = self
            .repository
            .find_by_id(id)
            .await
            .map_err(|source| {
                CommandError::persistence(format!("Failed to load startlist {id}"), source)
            })?;

        if let Some(startlist) = existing {
            return Ok(startlist);
        }
        if !options.allow_create {
            return Err(CommandError::NotFound(id.clone()));
        }

        let factory = self.factory.as_ref().ok_or_else(|| {
            CommandError::InvalidCommand(
                "Creating a startlist requires a startlist factory.".to_string(),
            )
        })?;
        let context = options.create_context.as_ref().ok_or_else(|| {
            CommandError::InvalidCommand(
                "Creating a startlist requires a creation context.".to_string(),
            )
        })?;
        factory.create(id, context)
    }

    /// Publish `events`, then persist version confirmations.
    async fn deliver(
        &self,
        startlist_id: &StartlistId,
        events: &[StartlistEvent],
    ) -> Result<(), CommandError> {
        let mut failures = Vec::new();

        if !events.is_empty() {
            match self.publisher.publish(events).await {
                Ok(()) => {
                    DeliveryMetrics::record_published(events.len());
                    tracing::debug!(count = events.len(), "Events published");
                }
                Err(error) => {
                    DeliveryMetrics::record_publish_error();
                    tracing::error!(
                        startlist_id = %startlist_id,
                        error = %error,
                        "Failed to publish committed startlist events"
                    );
                    failures.push(format!("publish: {error}"));
                }
            }
        }

        for record in events.iter().filter_map(StartlistEvent::version_record) {
            let Some(versions) = &self.version_repository else {
                tracing::warn!(
                    startlist_id = %startlist_id,
                    "Version confirmed but no version repository is configured"
                );
                continue;
            };
            match versions.save_version(record).await {
                Ok(saved) => {
                    DeliveryMetrics::record_version_saved();
                    tracing::info!(
                        startlist_id = %startlist_id,
                        version = %saved.version,
                        "Startlist version confirmed"
                    );
                }
                Err(error) => {
                    DeliveryMetrics::record_version_error();
                    tracing::error!(
                        startlist_id = %startlist_id,
                        error = %error,
                        "Failed to persist confirmed startlist version"
                    );
                    failures.push(format!("version: {error}"));
                }
            }
        }

        if failures.is_empty() {
            return Ok(());
        }
        match self.config.post_commit_failures {
            PostCommitFailureMode::Propagate => Err(CommandError::DeliveryFailed {
                startlist_id: startlist_id.clone(),
                reason: failures.join("; "),
            }),
            PostCommitFailureMode::LogAndContinue => {
                tracing::warn!(
                    startlist_id = %startlist_id,
                    failures = failures.len(),
                    "Continuing after post-commit delivery failures"
                );
                Ok(())
            }
        }
    }
}

/// Builder for [`CommandOrchestrator`].
pub struct CommandOrchestratorBuilder {
    repository: Arc<dyn StartlistRepository>,
    transaction_manager: Arc<dyn TransactionManager>,
    publisher: Arc<dyn EventPublisher>,
    version_repository: Option<Arc<dyn VersionRepository>>,
    factory: Option<Arc<dyn StartlistFactory>>,
    confirmation_policy: Option<Arc<dyn ConfirmationPolicy>>,
    clock: Option<Arc<dyn Clock>>,
    config: OrchestratorConfig,
}

impl CommandOrchestratorBuilder {
    /// Store confirmed versions in `repository`.
    #[must_use]
    pub fn version_repository(mut self, repository: Arc<dyn VersionRepository>) -> Self {
        self.version_repository = Some(repository);
        self
    }

    /// Allow creating startlists through `factory`.
    #[must_use]
    pub fn factory(mut self, factory: Arc<dyn StartlistFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Override the confirmation policy chosen by the configuration.
    #[must_use]
    pub fn confirmation_policy(mut self, policy: Arc<dyn ConfirmationPolicy>) -> Self {
        self.confirmation_policy = Some(policy);
        self
    }

    /// Clock injected into every loaded or created startlist.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the configuration.
    #[must_use]
    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the [`CommandOrchestrator`].
    #[must_use]
    pub fn build(self) -> CommandOrchestrator {
        let confirmation_policy = self.confirmation_policy.unwrap_or_else(|| {
            if self.config.confirm_on_finalize {
                Arc::new(ConfirmOnFinalize)
            } else {
                Arc::new(NoConfirmation)
            }
        });
        CommandOrchestrator {
            repository: self.repository,
            transaction_manager: self.transaction_manager,
            publisher: self.publisher,
            version_repository: self.version_repository,
            factory: self.factory,
            confirmation_policy,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            config: self.config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use startlist_core::startlist::StartlistStatus;

    fn at(text: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(text)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_default()
    }

    fn finalized_event() -> StartlistEvent {
        StartlistEvent::Finalized {
            startlist_id: StartlistId::new("sl-1"),
            snapshot: StartlistSnapshot {
                id: StartlistId::new("sl-1"),
                settings: None,
                lane_assignments: Vec::new(),
                class_assignments: Vec::new(),
                start_times: Vec::new(),
                status: StartlistStatus::Finalized,
            },
            occurred_at: at("2025-04-01T08:00:00Z"),
        }
    }

    #[test]
    fn confirm_on_finalize_appends_one_confirmation_per_finalization() {
        let events = vec![
            StartlistEvent::StartTimesInvalidated {
                startlist_id: StartlistId::new("sl-1"),
                reason: "x".to_string(),
                occurred_at: at("2025-04-01T07:00:00Z"),
            },
            finalized_event(),
        ];
        let confirmed_at = at("2025-04-01T08:00:01Z");
        let confirmations = ConfirmOnFinalize.confirmations(&events, confirmed_at);

        assert_eq!(confirmations.len(), 1);
        let record = confirmations[0].version_record();
        assert!(matches!(record, Some(r) if r.confirmed_at == confirmed_at));
    }

    #[test]
    fn no_confirmation_appends_nothing() {
        let confirmations = NoConfirmation.confirmations(&[finalized_event()], Utc::now());
        assert!(confirmations.is_empty());
    }

    #[test]
    fn default_factory_requires_event() {
        let id = StartlistId::new("sl-1");
        assert!(DefaultStartlistFactory.create(&id, &CreationContext::new(" ")).is_err());

        let created = DefaultStartlistFactory.create(
            &id,
            &CreationContext::new("spring-cup").requested_by("organizer"),
        );
        assert!(matches!(created, Ok(s) if s.status() == StartlistStatus::Draft));
    }

    #[test]
    fn run_options_default_forbids_creation() {
        let options = RunOptions::default();
        assert!(!options.allow_create);
        assert!(options.create_context.is_none());
        assert!(RunOptions::create(CreationContext::new("e")).allow_create);
    }
}
