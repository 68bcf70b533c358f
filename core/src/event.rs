//! Serialized domain events.
//!
//! Domain events are facts about state changes that have already been committed
//! (a reservation was cancelled, rooms were released). The domain crate defines
//! its own event enum; this module only provides the transport envelope used by
//! [`EventPublisher`](crate::event_bus::EventPublisher) implementations.
//!
//! Events are encoded as JSON so an outer transport (message broker, audit log)
//! can consume them without sharing Rust types.
//!
//! # Example
//!
//! ```
//! use hotel_core::event::{DomainEvent, SerializedEvent};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct RoomsBlocked { count: u32 }
//!
//! impl DomainEvent for RoomsBlocked {
//!     fn event_type(&self) -> &'static str { "RoomsBlocked.v1" }
//!     fn topic(&self) -> &'static str { "availability-events" }
//! }
//!
//! let event = SerializedEvent::from_event(&RoomsBlocked { count: 2 }).unwrap();
//! assert_eq!(event.event_type, "RoomsBlocked.v1");
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for event operations.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to serialize event to bytes.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// Failed to deserialize event from bytes.
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),
}

/// A domain event that can be published.
///
/// The `event_type()` should be a stable identifier that includes a version
/// suffix (`"ReservationCancelled.v1"`) so consumers can evolve with the schema.
pub trait DomainEvent: Serialize {
    /// Stable, versioned event type name.
    fn event_type(&self) -> &'static str;

    /// Topic the event is published to (`{aggregate}-events`).
    fn topic(&self) -> &'static str;
}

/// A serialized event ready to be handed to a publisher.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedEvent {
    /// Versioned event type name
    pub event_type: String,
    /// Topic the event belongs to
    pub topic: String,
    /// JSON payload
    pub data: Vec<u8>,
    /// When the event was serialized
    pub recorded_at: DateTime<Utc>,
}

impl SerializedEvent {
    /// Create a new serialized event.
    #[must_use]
    pub fn new(event_type: String, topic: String, data: Vec<u8>) -> Self {
        Self {
            event_type,
            topic,
            data,
            recorded_at: Utc::now(),
        }
    }

    /// Serialize a domain event into its envelope.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if the payload cannot be encoded.
    pub fn from_event<E: DomainEvent>(event: &E) -> Result<Self, EventError> {
        let data =
            serde_json::to_vec(event).map_err(|e| EventError::SerializationError(e.to_string()))?;
        Ok(Self::new(
            event.event_type().to_string(),
            event.topic().to_string(),
            data,
        ))
    }

    /// Decode the payload back into a typed value.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DeserializationError`] if the payload does not match `T`.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, EventError> {
        serde_json::from_slice(&self.data).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}
