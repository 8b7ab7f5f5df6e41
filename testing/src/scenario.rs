//! Given-When-Then harness for startlist operations
//!
//! Runs one aggregate operation against a prepared startlist and checks the
//! resulting state, the events it recorded, or the error it raised.

#![allow(clippy::module_name_repetitions)]

use startlist_core::error::DomainResult;
use startlist_core::event::{Event, StartlistEvent};
use startlist_core::startlist::{Startlist, StartlistStatus};

/// Type alias for the operation under test
type Operation = Box<dyn FnOnce(&mut Startlist) -> DomainResult<()>>;

/// Type alias for state assertion functions
type StateAssertion = Box<dyn FnOnce(&Startlist)>;

/// Type alias for event assertion functions
type EventAssertion = Box<dyn FnOnce(&[StartlistEvent])>;

/// Fluent API for testing startlist operations with Given-When-Then syntax
///
/// Events already pending on the given startlist are discarded first, so event
/// assertions only see what the operation under test recorded.
///
/// # Example
///
/// ```
/// use startlist_testing::{fixtures, StartlistTest};
///
/// StartlistTest::given(fixtures::draft("sl-1"))
///     .when(|startlist| startlist.invalidate_start_times("no-op"))
///     .then_error("No start times are assigned to invalidate.")
///     .run();
/// ```
pub struct StartlistTest {
    startlist: Startlist,
    operation: Option<Operation>,
    expected_error: Option<String>,
    state_assertions: Vec<StateAssertion>,
    event_assertions: Vec<EventAssertion>,
}

impl StartlistTest {
    /// Start from `startlist` (Given)
    #[must_use]
    pub fn given(mut startlist: Startlist) -> Self {
        startlist.pull_domain_events();
        Self {
            startlist,
            operation: None,
            expected_error: None,
            state_assertions: Vec::new(),
            event_assertions: Vec::new(),
        }
    }

    /// Set the operation to test (When)
    #[must_use]
    pub fn when<F>(mut self, operation: F) -> Self
    where
        F: FnOnce(&mut Startlist) -> DomainResult<()> + 'static,
    {
        self.operation = Some(Box::new(operation));
        self
    }

    /// Expect the operation to fail with exactly `message` and leave the
    /// startlist untouched (Then)
    #[must_use]
    pub fn then_error(mut self, message: impl Into<String>) -> Self {
        self.expected_error = Some(message.into());
        self
    }

    /// Add an assertion about the resulting startlist (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&Startlist) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Expect the resulting status (Then)
    #[must_use]
    pub fn then_status(self, expected: StartlistStatus) -> Self {
        self.then_state(move |startlist| {
            assert_eq!(startlist.status(), expected, "unexpected status");
        })
    }

    /// Add an assertion about the recorded events (Then)
    #[must_use]
    pub fn then_events<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[StartlistEvent]) + 'static,
    {
        self.event_assertions.push(Box::new(assertion));
        self
    }

    /// Expect exactly these event types, in order (Then)
    #[must_use]
    pub fn then_event_types(self, expected: &[&str]) -> Self {
        let expected: Vec<String> = expected.iter().map(ToString::to_string).collect();
        self.then_events(move |events| {
            let actual: Vec<&str> = events.iter().map(Event::event_type).collect();
            assert_eq!(actual, expected, "unexpected event types");
        })
    }

    /// Run the operation and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if no operation was set, if the outcome does not match the
    /// expected success or error, or if any assertion fails.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut startlist = self.startlist;
        let operation = self.operation.expect("Operation must be set with when()");
        let before = startlist.snapshot();

        let result = operation(&mut startlist);
        let events = startlist.pull_domain_events();

        match (result, self.expected_error) {
            (Ok(()), None) => {}
            (Err(error), Some(expected)) => {
                assert_eq!(error.message(), expected, "unexpected error message");
                assert_eq!(startlist.snapshot(), before, "failed operation changed state");
                assert!(events.is_empty(), "failed operation recorded events: {events:?}");
            }
            (Ok(()), Some(expected)) => {
                panic!("Expected error {expected:?}, but the operation succeeded");
            }
            (Err(error), None) => panic!("Operation failed unexpectedly: {error}"),
        }

        for assertion in self.state_assertions {
            assertion(&startlist);
        }
        for assertion in self.event_assertions {
            assertion(&events);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn finalize_scenario() {
        StartlistTest::given(fixtures::ready_to_finalize("sl-1"))
            .when(|startlist| startlist.finalize_startlist())
            .then_status(StartlistStatus::Finalized)
            .then_event_types(&["StartlistFinalized.v1"])
            .run();
    }

    #[test]
    fn error_scenario_checks_message() {
        StartlistTest::given(fixtures::draft("sl-1"))
            .when(|startlist| startlist.finalize_startlist())
            .then_error("Start times must be assigned before finalizing the startlist.")
            .then_status(StartlistStatus::Draft)
            .run();
    }

    #[test]
    #[should_panic(expected = "Expected error")]
    fn missing_error_panics() {
        StartlistTest::given(fixtures::ready_to_finalize("sl-1"))
            .when(|startlist| startlist.finalize_startlist())
            .then_error("anything")
            .run();
    }
}
