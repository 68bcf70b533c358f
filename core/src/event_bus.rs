//! Event publishing abstraction.
//!
//! Services publish domain events after the corresponding repository write has
//! succeeded. The publisher is a pluggable collaborator:
//!
//! - `TracingEventBus` (in `hotel-runtime`): logs every event, the default when no
//!   broker is configured
//! - `InMemoryEventBus` (in `hotel-testing`): records events for assertions
//!
//! # Key Principles
//!
//! - **Commit first**: events describe state that is already persisted
//! - **Best effort**: a failed publish never rolls back committed state
//!
//! # Topic Naming Convention
//!
//! Topics follow the pattern `{aggregate-type}-events`:
//! - `reservation-events`
//! - `availability-events`
//! - `waitlist-events`

use crate::event::SerializedEvent;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during event publishing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventBusError {
    /// Failed to publish an event to a topic
    #[error("Publish failed for topic '{topic}': {reason}")]
    PublishFailed {
        /// The topic that failed
        topic: String,
        /// The reason for failure
        reason: String,
    },

    /// Failed to serialize an event before publishing
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

/// Publisher for serialized domain events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event to its topic.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::PublishFailed`] if the transport rejected the event.
    async fn publish(&self, event: &SerializedEvent) -> Result<(), EventBusError>;
}
