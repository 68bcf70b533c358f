//! Coordination services.
//!
//! Aggregates never call each other. Everything that touches more than one of
//! them runs here:
//!
//! - [`AvailabilityService`]: inventory setup and all-or-nothing counter updates
//! - [`ReservationService`]: bookings, holding inventory for their whole stay
//! - [`WaitlistService`]: queued guests, notified when rooms are released
//!
//! Locks are always taken in the order Reservation → Availability (ascending
//! room-date key) → Waitlist entry, so concurrent operations cannot deadlock.
//! Events are published after the repository writes succeed; a failed publish
//! is logged and never undoes committed state.

mod availability;
mod commands;
mod error;
mod reservation;
mod waitlist;

pub use availability::{Adjustment, AvailabilityService};
pub use commands::{AddToWaitlist, CreateReservation, ReservationChanges};
pub use error::{ErrorKind, ServiceError};
pub use reservation::{CancellationOutcome, CheckOutOutcome, ReleaseOutcome, ReservationService};
pub use waitlist::WaitlistService;

use crate::config::Config;
use crate::events::HotelEvent;
use crate::pricing::RateProvider;
use crate::repository::{
    AvailabilityRepository, InMemoryAvailabilityRepository, InMemoryReservationRepository,
    InMemoryWaitlistRepository, ReservationRepository, WaitlistRepository,
};
use hotel_core::environment::Clock;
use hotel_core::event::SerializedEvent;
use hotel_core::event_bus::EventPublisher;
use std::sync::Arc;

/// Serialize and publish `event`, logging instead of failing.
pub(crate) async fn publish_event(publisher: &dyn EventPublisher, event: &HotelEvent) {
    let envelope = match SerializedEvent::from_event(event) {
        Ok(envelope) => envelope,
        Err(err) => {
            tracing::warn!(error = %err, "Failed to serialize event");
            return;
        }
    };

    if let Err(err) = publisher.publish(&envelope).await {
        tracing::warn!(
            event_type = %envelope.event_type,
            topic = %envelope.topic,
            error = %err,
            "Failed to publish event"
        );
    }
}

/// The three repositories the services run on.
#[derive(Clone)]
pub struct Repositories {
    /// Availability storage
    pub availability: Arc<dyn AvailabilityRepository>,
    /// Reservation storage
    pub reservations: Arc<dyn ReservationRepository>,
    /// Waitlist storage
    pub waitlist: Arc<dyn WaitlistRepository>,
}

impl Repositories {
    /// Fresh in-memory repositories
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            availability: Arc::new(InMemoryAvailabilityRepository::new()),
            reservations: Arc::new(InMemoryReservationRepository::new()),
            waitlist: Arc::new(InMemoryWaitlistRepository::new()),
        }
    }
}

/// The wired-up services.
#[derive(Clone)]
pub struct HotelServices {
    /// Inventory
    pub availability: Arc<AvailabilityService>,
    /// Bookings
    pub reservations: Arc<ReservationService>,
    /// Waitlist
    pub waitlist: Arc<WaitlistService>,
}

impl HotelServices {
    /// Wire the services over `repositories`.
    #[must_use]
    pub fn new(
        repositories: Repositories,
        config: &Config,
        clock: Arc<dyn Clock>,
        publisher: Arc<dyn EventPublisher>,
        rates: Arc<dyn RateProvider>,
    ) -> Self {
        let availability = Arc::new(AvailabilityService::new(
            repositories.availability,
            Arc::clone(&clock),
            Arc::clone(&publisher),
            config.retry_policy(),
        ));
        let waitlist = Arc::new(WaitlistService::new(
            repositories.waitlist,
            Arc::clone(&repositories.reservations),
            Arc::clone(&clock),
            Arc::clone(&publisher),
            config.waitlist.clone(),
        ));
        let reservations = Arc::new(ReservationService::new(
            repositories.reservations,
            Arc::clone(&availability),
            Arc::clone(&waitlist),
            rates,
            clock,
            publisher,
            config.stay_rules(),
        ));

        Self {
            availability,
            reservations,
            waitlist,
        }
    }

    /// Wire the services over fresh in-memory repositories.
    #[must_use]
    pub fn in_memory(
        config: &Config,
        clock: Arc<dyn Clock>,
        publisher: Arc<dyn EventPublisher>,
        rates: Arc<dyn RateProvider>,
    ) -> Self {
        Self::new(Repositories::in_memory(), config, clock, publisher, rates)
    }
}
