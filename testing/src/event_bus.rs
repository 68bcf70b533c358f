//! Event publishers for tests.
//!
//! - [`InMemoryEventBus`] records every published event so tests can assert on
//!   what a service emitted.
//! - [`FailingEventBus`] rejects every publish, for checking that a failed
//!   publish never undoes committed state.

use async_trait::async_trait;
use hotel_core::event::SerializedEvent;
use hotel_core::event_bus::{EventBusError, EventPublisher};
use std::sync::{Arc, PoisonError, RwLock};

/// Event publisher that keeps every event in memory.
///
/// Clones share the same buffer.
///
/// # Example
///
/// ```
/// use hotel_testing::InMemoryEventBus;
/// use hotel_core::{EventPublisher, SerializedEvent};
///
/// # tokio_test::block_on(async {
/// let bus = InMemoryEventBus::new();
/// let event = SerializedEvent::new("RoomsReserved.v1".into(), "availability-events".into(), vec![]);
/// bus.publish(&event).await.unwrap();
/// assert_eq!(bus.event_types(), vec!["RoomsReserved.v1"]);
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventBus {
    events: Arc<RwLock<Vec<SerializedEvent>>>,
}

impl InMemoryEventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every published event, in publish order.
    #[must_use]
    pub fn events(&self) -> Vec<SerializedEvent> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Event type names, in publish order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .map(|event| event.event_type)
            .collect()
    }

    /// Events with the given type name.
    #[must_use]
    pub fn events_of_type(&self, event_type: &str) -> Vec<SerializedEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.event_type == event_type)
            .collect()
    }

    /// Events published to `topic`.
    #[must_use]
    pub fn events_on_topic(&self, topic: &str) -> Vec<SerializedEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.topic == topic)
            .collect()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every recorded event.
    pub fn clear(&self) {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: &SerializedEvent) -> Result<(), EventBusError> {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}

/// Event publisher whose every publish fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingEventBus;

#[async_trait]
impl EventPublisher for FailingEventBus {
    async fn publish(&self, event: &SerializedEvent) -> Result<(), EventBusError> {
        Err(EventBusError::PublishFailed {
            topic: event.topic.clone(),
            reason: "broker unavailable".to_string(),
        })
    }
}
