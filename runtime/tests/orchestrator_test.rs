//! Integration tests for `CommandOrchestrator` against the in-memory ports.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use startlist_core::event::StartlistEvent;
use startlist_core::id::StartlistId;
use startlist_core::repository::RepositoryError;
use startlist_core::startlist::StartlistStatus;
use startlist_core::version_store::{VersionQuery, VersionRepository};
use startlist_runtime::{
    CommandError, CommandOrchestrator, DefaultStartlistFactory, NoConfirmation,
    OrchestratorConfig, PostCommitFailureMode, RunOptions,
};
use startlist_testing::{
    InMemoryStartlistRepository, InMemoryTransactionManager, InMemoryVersionRepository,
    RecordingEventPublisher, fixtures, init_tracing, test_clock,
};
use std::error::Error as _;
use std::sync::Arc;

struct Harness {
    repository: InMemoryStartlistRepository,
    versions: InMemoryVersionRepository,
    transactions: InMemoryTransactionManager,
    publisher: RecordingEventPublisher,
    orchestrator: CommandOrchestrator,
}

fn harness_with(config: OrchestratorConfig) -> Harness {
    init_tracing();
    let repository = InMemoryStartlistRepository::new();
    let versions = InMemoryVersionRepository::new();
    let transactions = InMemoryTransactionManager::new(repository.clone());
    let publisher = RecordingEventPublisher::new();
    let orchestrator = CommandOrchestrator::builder(
        Arc::new(repository.clone()),
        Arc::new(transactions.clone()),
        Arc::new(publisher.clone()),
    )
    .version_repository(Arc::new(versions.clone()))
    .factory(Arc::new(DefaultStartlistFactory))
    .clock(Arc::new(test_clock()))
    .config(config)
    .build();

    Harness {
        repository,
        versions,
        transactions,
        publisher,
        orchestrator,
    }
}

fn harness() -> Harness {
    harness_with(OrchestratorConfig::default())
}

fn id() -> StartlistId {
    StartlistId::new("sl-1")
}

mod loading_and_creation {
    use super::*;

    #[tokio::test]
    async fn missing_startlist_is_not_found() {
        let h = harness();
        let result = h.orchestrator.run(&id(), |_| Ok(()), RunOptions::default()).await;

        assert!(matches!(result, Err(CommandError::NotFound(ref missing)) if *missing == id()));
        assert!(h.repository.is_empty());
        assert_eq!(h.transactions.rollbacks(), 1);
    }

    #[tokio::test]
    async fn creation_without_context_is_invalid() {
        let h = harness();
        let options = RunOptions {
            allow_create: true,
            create_context: None,
        };
        let result = h.orchestrator.run(&id(), |_| Ok(()), options).await;

        assert!(matches!(result, Err(CommandError::InvalidCommand(_))));
        assert!(h.repository.is_empty());
    }

    #[tokio::test]
    async fn creation_without_factory_is_invalid() {
        let repository = InMemoryStartlistRepository::new();
        let orchestrator = CommandOrchestrator::builder(
            Arc::new(repository.clone()),
            Arc::new(InMemoryTransactionManager::new(repository.clone())),
            Arc::new(RecordingEventPublisher::new()),
        )
        .build();

        let result = orchestrator
            .run(&id(), |_| Ok(()), RunOptions::create(fixtures::creation_context()))
            .await;

        match result {
            Err(CommandError::InvalidCommand(message)) => {
                assert_eq!(message, "Creating a startlist requires a startlist factory.");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[tokio::test]
    async fn creates_and_mutates_in_one_unit_of_work() {
        let h = harness();
        let snapshot = h
            .orchestrator
            .run(
                &id(),
                |startlist| Ok(startlist.enter_settings(fixtures::settings(2))?),
                RunOptions::create(fixtures::creation_context()),
            )
            .await
            .unwrap();

        assert_eq!(snapshot.status, StartlistStatus::SettingsEntered);
        assert_eq!(h.repository.get(&id()), Some(snapshot));
        assert_eq!(h.transactions.commits(), 1);

        let events = h.publisher.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].occurred_at(), fixtures::instant("2025-01-01T00:00:00Z"));
    }

    #[tokio::test]
    async fn existing_startlist_is_loaded_even_when_creation_is_allowed() {
        let h = harness();
        h.repository.insert(fixtures::ordered("sl-1").snapshot());

        let snapshot = h
            .orchestrator
            .run(&id(), |_| Ok(()), RunOptions::create(fixtures::creation_context()))
            .await
            .unwrap();

        assert_eq!(snapshot.status, StartlistStatus::PlayerOrderAssigned);
    }
}

mod error_mapping {
    use super::*;

    #[tokio::test]
    async fn blank_id_is_rejected_before_the_unit_of_work() {
        let h = harness();

        for blank in ["", "   "] {
            let result = h
                .orchestrator
                .run(
                    &StartlistId::new(blank),
                    |_| Ok(()),
                    RunOptions::create(fixtures::creation_context()),
                )
                .await;

            match result {
                Err(CommandError::InvalidCommand(message)) => {
                    assert_eq!(message, "Startlist id must not be empty.");
                }
                other => panic!("unexpected result {other:?}"),
            }
            assert!(h.repository.get(&StartlistId::new(blank)).is_none());
        }
        assert!(h.repository.is_empty());
        assert_eq!(h.transactions.commits(), 0);
        assert_eq!(h.publisher.attempts(), 0);
    }

    #[tokio::test]
    async fn domain_error_becomes_invalid_command_and_rolls_back() {
        let h = harness();
        h.repository.insert(fixtures::draft("sl-1").snapshot());

        let result = h
            .orchestrator
            .run(
                &id(),
                |startlist| {
                    startlist.enter_settings(fixtures::settings(1))?;
                    Ok(startlist.finalize_startlist()?)
                },
                RunOptions::default(),
            )
            .await;

        match result {
            Err(CommandError::InvalidCommand(message)) => assert_eq!(
                message,
                "Start times must be assigned before finalizing the startlist."
            ),
            other => panic!("unexpected result {other:?}"),
        }
        assert_eq!(h.repository.get(&id()).unwrap().status, StartlistStatus::Draft);
        assert_eq!(h.publisher.attempts(), 0);
        assert_eq!(h.transactions.rollbacks(), 1);
    }

    #[tokio::test]
    async fn typed_errors_pass_through_unchanged() {
        let h = harness();
        h.repository.insert(fixtures::draft("sl-1").snapshot());

        let result = h
            .orchestrator
            .run(
                &id(),
                |_| Err(CommandError::NotFound(StartlistId::new("linked-startlist"))),
                RunOptions::default(),
            )
            .await;

        assert!(matches!(
            result,
            Err(CommandError::NotFound(ref other)) if other.as_str() == "linked-startlist"
        ));
    }

    #[tokio::test]
    async fn save_failure_is_wrapped_as_persistence() {
        let h = harness();
        h.repository.insert(fixtures::draft("sl-1").snapshot());
        h.repository.fail_saves(true);

        let result = h
            .orchestrator
            .run(
                &id(),
                |startlist| Ok(startlist.enter_settings(fixtures::settings(1))?),
                RunOptions::default(),
            )
            .await;

        let error = result.unwrap_err();
        assert!(matches!(
            &error,
            CommandError::Persistence { message, source: RepositoryError::DatabaseError(_) }
                if message == "Failed to save startlist sl-1"
        ));
        assert!(!error.to_string().contains("injected"));
        assert!(error.source().is_some());
        assert_eq!(h.publisher.attempts(), 0);
    }

    #[tokio::test]
    async fn load_failure_is_wrapped_as_persistence() {
        let h = harness();
        h.repository.fail_loads(true);

        let result = h.orchestrator.run(&id(), |_| Ok(()), RunOptions::default()).await;

        assert!(matches!(result, Err(CommandError::Persistence { .. })));
    }

    #[tokio::test]
    async fn commit_failure_restores_previous_state() {
        let h = harness();
        h.repository.insert(fixtures::draft("sl-1").snapshot());
        h.transactions.fail_commits(true);

        let result = h
            .orchestrator
            .run(
                &id(),
                |startlist| Ok(startlist.enter_settings(fixtures::settings(1))?),
                RunOptions::default(),
            )
            .await;

        assert!(matches!(result, Err(CommandError::Transaction(_))));
        assert_eq!(h.repository.get(&id()).unwrap().status, StartlistStatus::Draft);
        assert_eq!(h.publisher.attempts(), 0);
    }
}

mod delivery {
    use super::*;

    #[tokio::test]
    async fn no_op_mutation_saves_but_skips_publishing() {
        let h = harness();
        h.repository.insert(fixtures::ordered("sl-1").snapshot());

        h.orchestrator
            .run(&id(), |_| Ok(()), RunOptions::default())
            .await
            .unwrap();

        assert_eq!(h.repository.save_count(), 1);
        assert_eq!(h.publisher.attempts(), 0);
    }

    #[tokio::test]
    async fn finalization_publishes_and_persists_a_version() {
        let h = harness();
        h.repository.insert(fixtures::ready_to_finalize("sl-1").snapshot());

        let snapshot = h
            .orchestrator
            .run(
                &id(),
                |startlist| Ok(startlist.finalize_startlist()?),
                RunOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(snapshot.status, StartlistStatus::Finalized);
        assert_eq!(
            h.publisher.event_types(),
            ["StartlistFinalized.v1", "StartlistVersionConfirmed.v1"]
        );

        let versions = h
            .versions
            .find_versions(VersionQuery::latest(id(), 1))
            .await
            .unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].version.value(), 1);
        assert_eq!(versions[0].snapshot, snapshot);
        assert_eq!(versions[0].confirmed_at, fixtures::instant("2025-01-01T00:00:00Z"));
    }

    #[tokio::test]
    async fn refinalizing_adds_a_new_version() {
        let h = harness();
        h.repository.insert(fixtures::ready_to_finalize("sl-1").snapshot());
        h.orchestrator
            .run(
                &id(),
                |startlist| Ok(startlist.finalize_startlist()?),
                RunOptions::default(),
            )
            .await
            .unwrap();
        h.orchestrator
            .run(
                &id(),
                |startlist| {
                    startlist.invalidate_start_times("Course changed")?;
                    startlist.assign_start_times(vec![
                        fixtures::start_time("p1", 1, 0),
                        fixtures::start_time("p2", 1, 45),
                        fixtures::start_time("p3", 2, 0),
                    ])?;
                    Ok(startlist.finalize_startlist()?)
                },
                RunOptions::default(),
            )
            .await
            .unwrap();

        let numbers: Vec<u64> = h
            .versions
            .versions(&id())
            .iter()
            .map(|record| record.version.value())
            .collect();
        assert_eq!(numbers, [1, 2]);
    }

    #[tokio::test]
    async fn disabled_confirmation_stores_no_versions() {
        let h = harness_with(OrchestratorConfig {
            confirm_on_finalize: false,
            ..OrchestratorConfig::default()
        });
        h.repository.insert(fixtures::ready_to_finalize("sl-1").snapshot());

        h.orchestrator
            .run(
                &id(),
                |startlist| Ok(startlist.finalize_startlist()?),
                RunOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(h.publisher.event_types(), ["StartlistFinalized.v1"]);
        assert!(h.versions.is_empty());
    }

    #[tokio::test]
    async fn explicit_policy_overrides_configuration() {
        let repository = InMemoryStartlistRepository::new();
        let versions = InMemoryVersionRepository::new();
        repository.insert(fixtures::ready_to_finalize("sl-1").snapshot());
        let orchestrator = CommandOrchestrator::builder(
            Arc::new(repository.clone()),
            Arc::new(InMemoryTransactionManager::new(repository.clone())),
            Arc::new(RecordingEventPublisher::new()),
        )
        .version_repository(Arc::new(versions.clone()))
        .confirmation_policy(Arc::new(NoConfirmation))
        .build();

        orchestrator
            .run(
                &id(),
                |startlist| Ok(startlist.finalize_startlist()?),
                RunOptions::default(),
            )
            .await
            .unwrap();

        assert!(versions.is_empty());
    }

    #[tokio::test]
    async fn publish_failure_is_reported_after_commit() {
        let h = harness();
        h.repository.insert(fixtures::ready_to_finalize("sl-1").snapshot());
        h.publisher.fail_publishes(true);

        let result = h
            .orchestrator
            .run(
                &id(),
                |startlist| Ok(startlist.finalize_startlist()?),
                RunOptions::default(),
            )
            .await;

        let error = result.unwrap_err();
        assert!(error.is_committed());
        assert!(matches!(
            &error,
            CommandError::DeliveryFailed { reason, .. } if reason.starts_with("publish:")
        ));
        // State is durable and the version was still attempted.
        assert_eq!(h.repository.get(&id()).unwrap().status, StartlistStatus::Finalized);
        assert_eq!(h.versions.versions(&id()).len(), 1);
        assert_eq!(h.transactions.commits(), 1);
    }

    #[tokio::test]
    async fn version_failure_is_reported_after_publishing() {
        let h = harness();
        h.repository.insert(fixtures::ready_to_finalize("sl-1").snapshot());
        h.versions.fail_saves(true);

        let result = h
            .orchestrator
            .run(
                &id(),
                |startlist| Ok(startlist.finalize_startlist()?),
                RunOptions::default(),
            )
            .await;

        assert!(matches!(
            result,
            Err(CommandError::DeliveryFailed { ref reason, .. }) if reason.starts_with("version:")
        ));
        assert_eq!(h.publisher.batches().len(), 1);
    }

    #[tokio::test]
    async fn log_and_continue_returns_the_snapshot() {
        let h = harness_with(OrchestratorConfig {
            post_commit_failures: PostCommitFailureMode::LogAndContinue,
            ..OrchestratorConfig::default()
        });
        h.repository.insert(fixtures::ready_to_finalize("sl-1").snapshot());
        h.publisher.fail_publishes(true);
        h.versions.fail_saves(true);

        let snapshot = h
            .orchestrator
            .run(
                &id(),
                |startlist| Ok(startlist.finalize_startlist()?),
                RunOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(snapshot.status, StartlistStatus::Finalized);
        assert!(h.versions.is_empty());
        assert_eq!(h.publisher.attempts(), 1);
    }

    #[tokio::test]
    async fn reopening_publishes_invalidation_before_new_order() {
        let h = harness();
        h.repository.insert(fixtures::finalized("sl-1").snapshot());

        h.orchestrator
            .run(
                &id(),
                |startlist| {
                    Ok(startlist.assign_lane_order_and_intervals(vec![
                        fixtures::lane(1, &["W21"]),
                        fixtures::lane(2, &["M21"]),
                    ])?)
                },
                RunOptions::default(),
            )
            .await
            .unwrap();

        let batches = h.publisher.batches();
        assert_eq!(batches.len(), 1);
        assert!(matches!(batches[0][0], StartlistEvent::StartTimesInvalidated { .. }));
        assert!(matches!(batches[0][1], StartlistEvent::LaneOrderAssigned { .. }));

        let serialized = h.publisher.serialized();
        assert_eq!(serialized[1].metadata.as_ref().unwrap()["startlistId"], "sl-1");
    }
}
