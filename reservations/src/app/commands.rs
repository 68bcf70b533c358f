//! Typed commands accepted by the coordination services.

use crate::types::{
    DateRange, GuestCount, GuestId, Priority, RequestType, ReservationSource, RoomTypeId,
};

pub use crate::aggregates::ReservationChanges;

/// Book `room_count` rooms of one type for a stay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateReservation {
    /// Guest making the booking
    pub guest_id: GuestId,
    /// Wanted room type
    pub room_type_id: RoomTypeId,
    /// Stay
    pub date_range: DateRange,
    /// Occupants
    pub guest_count: GuestCount,
    /// Rooms per night
    pub room_count: u32,
    /// Booking channel
    pub source: ReservationSource,
    /// Requests made at booking time
    pub special_requests: Vec<(RequestType, String)>,
    /// Actor issuing the command
    pub created_by: String,
}

impl CreateReservation {
    /// One room, booked online by `SYSTEM`, without special requests.
    #[must_use]
    pub fn new(
        guest_id: GuestId,
        room_type_id: RoomTypeId,
        date_range: DateRange,
        guest_count: GuestCount,
    ) -> Self {
        Self {
            guest_id,
            room_type_id,
            date_range,
            guest_count,
            room_count: 1,
            source: ReservationSource::default(),
            special_requests: Vec::new(),
            created_by: "SYSTEM".to_string(),
        }
    }

    /// Book several rooms per night
    #[must_use]
    pub const fn with_room_count(mut self, room_count: u32) -> Self {
        self.room_count = room_count;
        self
    }

    /// Set the booking channel
    #[must_use]
    pub const fn with_source(mut self, source: ReservationSource) -> Self {
        self.source = source;
        self
    }

    /// Add a special request
    #[must_use]
    pub fn with_special_request(mut self, request_type: RequestType, description: impl Into<String>) -> Self {
        self.special_requests.push((request_type, description.into()));
        self
    }

    /// Record who issued the command
    #[must_use]
    pub fn created_by(mut self, actor: impl Into<String>) -> Self {
        self.created_by = actor.into();
        self
    }
}

/// Queue a guest for a stay that is sold out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddToWaitlist {
    /// Waiting guest
    pub guest_id: GuestId,
    /// Wanted room type
    pub room_type_id: RoomTypeId,
    /// Wanted stay
    pub date_range: DateRange,
    /// Occupants
    pub guest_count: GuestCount,
    /// Queue priority
    pub priority: Priority,
    /// Free-text notes
    pub notes: Option<String>,
}

impl AddToWaitlist {
    /// Medium priority, no notes.
    #[must_use]
    pub const fn new(
        guest_id: GuestId,
        room_type_id: RoomTypeId,
        date_range: DateRange,
        guest_count: GuestCount,
    ) -> Self {
        Self {
            guest_id,
            room_type_id,
            date_range,
            guest_count,
            priority: Priority::Medium,
            notes: None,
        }
    }

    /// Set the priority
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Attach notes
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}
