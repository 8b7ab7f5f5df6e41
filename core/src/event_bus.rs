//! Event publisher port for integration delivery.
//!
//! Publication happens after the unit of work that produced the events has
//! committed:
//!
//! ```text
//! ┌─────────────────┐
//! │ 1. Mutate +     │
//! │    save state   │◄─── inside the transaction
//! └────────┬────────┘
//!          │ commit
//!          ▼
//! ┌─────────────────┐
//! │ 2. Publish      │◄─── best effort, after commit
//! │    events       │
//! └─────────────────┘
//! ```
//!
//! A failed publish cannot undo the committed state; subscribers may miss
//! events on that path and must tolerate gaps as well as duplicates.

use crate::event::StartlistEvent;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Topic startlist events are published on.
pub const STARTLIST_EVENTS_TOPIC: &str = "startlist-events";

/// Errors that can occur while publishing events.
#[derive(Error, Debug, Clone)]
pub enum PublishError {
    /// The bus rejected the batch.
    #[error("Publish failed for topic '{topic}': {reason}")]
    PublishFailed {
        /// The topic that failed
        topic: String,
        /// The reason for failure
        reason: String,
    },

    /// An event could not be encoded for the bus.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),
}

/// Outbound port delivering domain events to an integration bus.
///
/// # Dyn Compatibility
///
/// Returns `Pin<Box<dyn Future>>` so the publisher can be shared as
/// `Arc<dyn EventPublisher>`.
pub trait EventPublisher: Send + Sync {
    /// Publish a batch of events, preserving their order.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::SerializationFailed`] if an event cannot be
    /// encoded, or [`PublishError::PublishFailed`] if the bus rejects the batch.
    fn publish(
        &self,
        events: &[StartlistEvent],
    ) -> Pin<Box<dyn Future<Output = Result<(), PublishError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_failed_display_names_topic() {
        let error = PublishError::PublishFailed {
            topic: STARTLIST_EVENTS_TOPIC.to_string(),
            reason: "broker unavailable".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Publish failed for topic 'startlist-events': broker unavailable"
        );
    }
}
