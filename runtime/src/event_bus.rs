//! Logging event publisher.
//!
//! [`TracingEventBus`] is the publisher used when no message broker is wired in.
//! Every event is emitted as a structured `tracing` record on the
//! `hotel::events` target and counted in the event metrics.

use crate::metrics::EventMetrics;
use async_trait::async_trait;
use hotel_core::event::SerializedEvent;
use hotel_core::event_bus::{EventBusError, EventPublisher};

/// Event publisher that writes every event to the tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventBus;

impl TracingEventBus {
    /// Create a new tracing publisher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPublisher for TracingEventBus {
    async fn publish(&self, event: &SerializedEvent) -> Result<(), EventBusError> {
        let payload = String::from_utf8_lossy(&event.data);
        tracing::info!(
            target: "hotel::events",
            topic = %event.topic,
            event_type = %event.event_type,
            recorded_at = %event.recorded_at,
            payload = %payload,
            "Domain event published"
        );
        EventMetrics::record_published(&event.topic);
        Ok(())
    }
}
