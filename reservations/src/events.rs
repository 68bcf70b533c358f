//! Domain events published by the coordination services.
//!
//! Events are facts about committed state. They are serialised as JSON with a
//! `type` tag and published to one topic per aggregate:
//!
//! | Topic                 | Events |
//! |-----------------------|--------|
//! | `reservation-events`  | `ReservationCreated`, `ReservationModified`, `ReservationConfirmed`, `GuestCheckedIn`, `GuestCheckedOut`, `ReservationCancelled`, `NoShowRecorded`, `SpecialRequestAdded` |
//! | `availability-events` | `AvailabilityChanged` |
//! | `waitlist-events`     | `WaitlistEntryCreated`, `WaitlistNotified`, `WaitlistConverted`, `WaitlistExpired`, `WaitlistCancelled`, `PriorityUpgraded` |

use crate::aggregates::{Availability, InventoryAction, Reservation, WaitlistEntry};
use crate::types::{
    ConfirmationCode, DateRange, GuestId, Money, Priority, RequestType, ReservationId, RoomTypeId,
    SpecialRequestId, WaitlistId,
};
use chrono::{DateTime, NaiveDate, Utc};
use hotel_core::event::DomainEvent;
use serde::{Deserialize, Serialize};

/// Topic for reservation lifecycle events
pub const RESERVATION_TOPIC: &str = "reservation-events";
/// Topic for inventory changes
pub const AVAILABILITY_TOPIC: &str = "availability-events";
/// Topic for waitlist events
pub const WAITLIST_TOPIC: &str = "waitlist-events";

/// Everything that can happen in the hotel domain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
#[allow(missing_docs)]
pub enum HotelEvent {
    ReservationCreated {
        reservation_id: ReservationId,
        confirmation_code: ConfirmationCode,
        guest_id: GuestId,
        room_type_id: RoomTypeId,
        date_range: DateRange,
        room_count: u32,
        total_amount: Money,
        occurred_at: DateTime<Utc>,
    },
    ReservationModified {
        reservation_id: ReservationId,
        room_type_id: RoomTypeId,
        date_range: DateRange,
        room_count: u32,
        total_amount: Money,
        occurred_at: DateTime<Utc>,
    },
    ReservationConfirmed {
        reservation_id: ReservationId,
        occurred_at: DateTime<Utc>,
    },
    SpecialRequestAdded {
        reservation_id: ReservationId,
        request_id: SpecialRequestId,
        request_type: RequestType,
        occurred_at: DateTime<Utc>,
    },
    GuestCheckedIn {
        reservation_id: ReservationId,
        room_number: String,
        occurred_at: DateTime<Utc>,
    },
    GuestCheckedOut {
        reservation_id: ReservationId,
        amount_due: Money,
        occurred_at: DateTime<Utc>,
    },
    ReservationCancelled {
        reservation_id: ReservationId,
        reason: String,
        refund: Money,
        occurred_at: DateTime<Utc>,
    },
    NoShowRecorded {
        reservation_id: ReservationId,
        occurred_at: DateTime<Utc>,
    },
    AvailabilityChanged {
        room_type_id: RoomTypeId,
        date: NaiveDate,
        action: InventoryAction,
        count: u32,
        reserved_rooms: u32,
        blocked_rooms: u32,
        occurred_at: DateTime<Utc>,
    },
    WaitlistEntryCreated {
        waitlist_id: WaitlistId,
        guest_id: GuestId,
        room_type_id: RoomTypeId,
        date_range: DateRange,
        priority: Priority,
        occurred_at: DateTime<Utc>,
    },
    WaitlistNotified {
        waitlist_id: WaitlistId,
        occurred_at: DateTime<Utc>,
    },
    WaitlistConverted {
        waitlist_id: WaitlistId,
        reservation_id: ReservationId,
        occurred_at: DateTime<Utc>,
    },
    WaitlistExpired {
        waitlist_id: WaitlistId,
        occurred_at: DateTime<Utc>,
    },
    WaitlistCancelled {
        waitlist_id: WaitlistId,
        occurred_at: DateTime<Utc>,
    },
    PriorityUpgraded {
        waitlist_id: WaitlistId,
        from: Priority,
        to: Priority,
        occurred_at: DateTime<Utc>,
    },
}

impl HotelEvent {
    /// `ReservationCreated` for a freshly stored reservation
    #[must_use]
    pub fn reservation_created(reservation: &Reservation) -> Self {
        Self::ReservationCreated {
            reservation_id: reservation.id(),
            confirmation_code: reservation.confirmation_code().clone(),
            guest_id: reservation.guest_id(),
            room_type_id: reservation.room_type_id().clone(),
            date_range: *reservation.date_range(),
            room_count: reservation.room_count(),
            total_amount: reservation.total_amount().clone(),
            occurred_at: reservation.created_at(),
        }
    }

    /// `ReservationModified` carrying the new stay and total
    #[must_use]
    pub fn reservation_modified(reservation: &Reservation) -> Self {
        Self::ReservationModified {
            reservation_id: reservation.id(),
            room_type_id: reservation.room_type_id().clone(),
            date_range: *reservation.date_range(),
            room_count: reservation.room_count(),
            total_amount: reservation.total_amount().clone(),
            occurred_at: reservation.modified_at(),
        }
    }

    /// `AvailabilityChanged` after `action` was applied to `availability`
    #[must_use]
    pub fn availability_changed(
        availability: &Availability,
        action: InventoryAction,
        count: u32,
    ) -> Self {
        Self::AvailabilityChanged {
            room_type_id: availability.room_type_id().clone(),
            date: availability.date(),
            action,
            count,
            reserved_rooms: availability.reserved_rooms(),
            blocked_rooms: availability.blocked_rooms(),
            occurred_at: availability.last_updated(),
        }
    }

    /// `WaitlistEntryCreated` for a freshly stored entry
    #[must_use]
    pub fn waitlist_entry_created(entry: &WaitlistEntry) -> Self {
        Self::WaitlistEntryCreated {
            waitlist_id: entry.id(),
            guest_id: entry.guest_id(),
            room_type_id: entry.room_type_id().clone(),
            date_range: *entry.date_range(),
            priority: entry.priority(),
            occurred_at: entry.created_at(),
        }
    }

    /// When the fact was recorded
    #[must_use]
    pub const fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::ReservationCreated { occurred_at, .. }
            | Self::ReservationModified { occurred_at, .. }
            | Self::ReservationConfirmed { occurred_at, .. }
            | Self::SpecialRequestAdded { occurred_at, .. }
            | Self::GuestCheckedIn { occurred_at, .. }
            | Self::GuestCheckedOut { occurred_at, .. }
            | Self::ReservationCancelled { occurred_at, .. }
            | Self::NoShowRecorded { occurred_at, .. }
            | Self::AvailabilityChanged { occurred_at, .. }
            | Self::WaitlistEntryCreated { occurred_at, .. }
            | Self::WaitlistNotified { occurred_at, .. }
            | Self::WaitlistConverted { occurred_at, .. }
            | Self::WaitlistExpired { occurred_at, .. }
            | Self::WaitlistCancelled { occurred_at, .. }
            | Self::PriorityUpgraded { occurred_at, .. } => *occurred_at,
        }
    }
}

impl DomainEvent for HotelEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::ReservationCreated { .. } => "ReservationCreated.v1",
            Self::ReservationModified { .. } => "ReservationModified.v1",
            Self::ReservationConfirmed { .. } => "ReservationConfirmed.v1",
            Self::SpecialRequestAdded { .. } => "SpecialRequestAdded.v1",
            Self::GuestCheckedIn { .. } => "GuestCheckedIn.v1",
            Self::GuestCheckedOut { .. } => "GuestCheckedOut.v1",
            Self::ReservationCancelled { .. } => "ReservationCancelled.v1",
            Self::NoShowRecorded { .. } => "NoShowRecorded.v1",
            Self::AvailabilityChanged { .. } => "AvailabilityChanged.v1",
            Self::WaitlistEntryCreated { .. } => "WaitlistEntryCreated.v1",
            Self::WaitlistNotified { .. } => "WaitlistNotified.v1",
            Self::WaitlistConverted { .. } => "WaitlistConverted.v1",
            Self::WaitlistExpired { .. } => "WaitlistExpired.v1",
            Self::WaitlistCancelled { .. } => "WaitlistCancelled.v1",
            Self::PriorityUpgraded { .. } => "PriorityUpgraded.v1",
        }
    }

    fn topic(&self) -> &'static str {
        match self {
            Self::ReservationCreated { .. }
            | Self::ReservationModified { .. }
            | Self::ReservationConfirmed { .. }
            | Self::SpecialRequestAdded { .. }
            | Self::GuestCheckedIn { .. }
            | Self::GuestCheckedOut { .. }
            | Self::ReservationCancelled { .. }
            | Self::NoShowRecorded { .. } => RESERVATION_TOPIC,
            Self::AvailabilityChanged { .. } => AVAILABILITY_TOPIC,
            Self::WaitlistEntryCreated { .. }
            | Self::WaitlistNotified { .. }
            | Self::WaitlistConverted { .. }
            | Self::WaitlistExpired { .. }
            | Self::WaitlistCancelled { .. }
            | Self::PriorityUpgraded { .. } => WAITLIST_TOPIC,
        }
    }
}
