//! Property tests driving random operation sequences through the orchestrator.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use startlist_core::event::StartlistEvent;
use startlist_core::id::StartlistId;
use startlist_core::startlist::Startlist;
use startlist_runtime::{CommandError, CommandOrchestrator, DefaultStartlistFactory, RunOptions};
use startlist_testing::properties::{invariant_violations, operations};
use startlist_testing::{
    InMemoryStartlistRepository, InMemoryTransactionManager, InMemoryVersionRepository,
    RecordingEventPublisher, fixtures, test_clock,
};
use std::sync::Arc;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn committed_state_matches_returned_snapshot(ops in operations(12)) {
        let repository = InMemoryStartlistRepository::new();
        let publisher = RecordingEventPublisher::new();
        let versions = InMemoryVersionRepository::new();
        let orchestrator = CommandOrchestrator::builder(
            Arc::new(repository.clone()),
            Arc::new(InMemoryTransactionManager::new(repository.clone())),
            Arc::new(publisher.clone()),
        )
        .version_repository(Arc::new(versions.clone()))
        .factory(Arc::new(DefaultStartlistFactory))
        .clock(Arc::new(test_clock()))
        .build();
        let id = StartlistId::new("prop");

        let mut published = 0;
        for operation in ops {
            let before = repository.get(&id);
            let result = tokio_test::block_on(orchestrator.run(
                &id,
                move |startlist| Ok(operation.apply(startlist)?),
                RunOptions::create(fixtures::creation_context()),
            ));

            match result {
                Ok(snapshot) => {
                    prop_assert_eq!(repository.get(&id), Some(snapshot.clone()));
                    let violations = invariant_violations(&Startlist::reconstitute(snapshot));
                    prop_assert!(violations.is_empty(), "{:?}", violations);
                }
                Err(error) => {
                    prop_assert!(matches!(error, CommandError::InvalidCommand(_)));
                    prop_assert_eq!(repository.get(&id), before);
                }
            }

            let now_published = publisher.events().len();
            prop_assert!(now_published >= published);
            published = now_published;
        }

        let finalizations = publisher
            .events()
            .iter()
            .filter(|event| matches!(event, StartlistEvent::Finalized { .. }))
            .count();
        prop_assert_eq!(versions.len(), finalizations);
    }
}
