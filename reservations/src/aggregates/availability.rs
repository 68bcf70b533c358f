//! Availability aggregate: room inventory for one room type on one night.
//!
//! The aggregate's single invariant is
//!
//! ```text
//! reserved_rooms + blocked_rooms <= total_rooms + overbooking_threshold
//! ```
//!
//! Every mutation checks it before touching a counter, so a failed operation
//! leaves the record unchanged. Multi-night operations are composed by the
//! [`AvailabilityService`](crate::app::AvailabilityService), which validates every
//! night before committing any of them.

use crate::error::DomainError;
use crate::types::{AvailabilityKey, RoomTypeId};
use chrono::{DateTime, NaiveDate, Utc};
use hotel_core::{Aggregate, Version};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A change to the room counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryAction {
    /// Hold rooms for a reservation
    Reserve,
    /// Return reserved rooms
    Release,
    /// Take rooms out of sale (maintenance, events)
    Block,
    /// Put blocked rooms back on sale
    Unblock,
}

impl InventoryAction {
    /// The action that undoes this one
    #[must_use]
    pub const fn inverse(self) -> Self {
        match self {
            Self::Reserve => Self::Release,
            Self::Release => Self::Reserve,
            Self::Block => Self::Unblock,
            Self::Unblock => Self::Block,
        }
    }

    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reserve => "RESERVE",
            Self::Release => "RELEASE",
            Self::Block => "BLOCK",
            Self::Unblock => "UNBLOCK",
        }
    }
}

impl fmt::Display for InventoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Room inventory for a (room type, date) pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    room_type_id: RoomTypeId,
    date: NaiveDate,
    total_rooms: u32,
    reserved_rooms: u32,
    blocked_rooms: u32,
    overbooking_threshold: u32,
    block_reason: Option<String>,
    last_updated: DateTime<Utc>,
    version: Version,
}

impl Availability {
    /// Set up inventory for a night with nothing reserved or blocked.
    #[must_use]
    pub const fn new(
        room_type_id: RoomTypeId,
        date: NaiveDate,
        total_rooms: u32,
        overbooking_threshold: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            room_type_id,
            date,
            total_rooms,
            reserved_rooms: 0,
            blocked_rooms: 0,
            overbooking_threshold,
            block_reason: None,
            last_updated: now,
            version: Version::FIRST,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The room-date key
    #[must_use]
    pub fn key(&self) -> AvailabilityKey {
        AvailabilityKey::new(self.room_type_id.clone(), self.date)
    }

    /// Room type
    #[must_use]
    pub const fn room_type_id(&self) -> &RoomTypeId {
        &self.room_type_id
    }

    /// Night
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// Physical rooms of this type
    #[must_use]
    pub const fn total_rooms(&self) -> u32 {
        self.total_rooms
    }

    /// Rooms held by reservations
    #[must_use]
    pub const fn reserved_rooms(&self) -> u32 {
        self.reserved_rooms
    }

    /// Rooms out of sale
    #[must_use]
    pub const fn blocked_rooms(&self) -> u32 {
        self.blocked_rooms
    }

    /// Rooms that may be sold beyond `total_rooms`
    #[must_use]
    pub const fn overbooking_threshold(&self) -> u32 {
        self.overbooking_threshold
    }

    /// Reason given for the most recent block
    #[must_use]
    pub fn block_reason(&self) -> Option<&str> {
        self.block_reason.as_deref()
    }

    /// Time of the last mutation
    #[must_use]
    pub const fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    // ------------------------------------------------------------------
    // Derived queries
    // ------------------------------------------------------------------

    /// `total_rooms + overbooking_threshold`
    #[must_use]
    pub fn capacity_ceiling(&self) -> u64 {
        u64::from(self.total_rooms) + u64::from(self.overbooking_threshold)
    }

    fn occupied(&self) -> u64 {
        u64::from(self.reserved_rooms) + u64::from(self.blocked_rooms)
    }

    /// Physical rooms left; negative once overbooked.
    #[must_use]
    pub fn available_rooms(&self) -> i64 {
        i64::from(self.total_rooms) - i64::from(self.reserved_rooms) - i64::from(self.blocked_rooms)
    }

    /// Rooms still assignable including the overbooking allowance.
    #[must_use]
    pub fn headroom(&self) -> i64 {
        self.available_rooms() + i64::from(self.overbooking_threshold)
    }

    /// No physical room left
    #[must_use]
    pub fn is_fully_booked(&self) -> bool {
        self.available_rooms() <= 0
    }

    /// Overbooking allowance not yet used up
    #[must_use]
    pub fn can_overbook(&self) -> bool {
        let overbooked = (-self.available_rooms()).max(0);
        overbooked < i64::from(self.overbooking_threshold)
    }

    /// Whether `count` more rooms fit under the capacity ceiling
    #[must_use]
    pub fn can_accommodate(&self, count: u32) -> bool {
        self.occupied() + u64::from(count) <= self.capacity_ceiling()
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Hold `count` rooms.
    ///
    /// # Errors
    ///
    /// [`DomainError::InsufficientCapacity`] if the ceiling would be exceeded.
    pub fn reserve_rooms(&mut self, count: u32, now: DateTime<Utc>) -> Result<(), DomainError> {
        Self::ensure_positive(count)?;
        self.ensure_capacity(count)?;
        self.reserved_rooms += count;
        self.touch(now);
        Ok(())
    }

    /// Return `count` reserved rooms.
    ///
    /// # Errors
    ///
    /// [`DomainError::InvalidRelease`] if fewer than `count` rooms are reserved.
    pub fn release_rooms(&mut self, count: u32, now: DateTime<Utc>) -> Result<(), DomainError> {
        Self::ensure_positive(count)?;
        if count > self.reserved_rooms {
            return Err(DomainError::InvalidRelease {
                requested: count,
                held: self.reserved_rooms,
            });
        }
        self.reserved_rooms -= count;
        self.touch(now);
        Ok(())
    }

    /// Take `count` rooms out of sale.
    ///
    /// # Errors
    ///
    /// [`DomainError::InsufficientCapacity`] if the ceiling would be exceeded.
    pub fn block_rooms(
        &mut self,
        count: u32,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        Self::ensure_positive(count)?;
        self.ensure_capacity(count)?;
        self.blocked_rooms += count;
        self.block_reason = Some(reason.into());
        self.touch(now);
        Ok(())
    }

    /// Put `count` blocked rooms back on sale.
    ///
    /// # Errors
    ///
    /// [`DomainError::InvalidRelease`] if fewer than `count` rooms are blocked.
    pub fn unblock_rooms(&mut self, count: u32, now: DateTime<Utc>) -> Result<(), DomainError> {
        Self::ensure_positive(count)?;
        if count > self.blocked_rooms {
            return Err(DomainError::InvalidRelease {
                requested: count,
                held: self.blocked_rooms,
            });
        }
        self.blocked_rooms -= count;
        self.touch(now);
        Ok(())
    }

    /// Apply `action` for `count` rooms.
    ///
    /// # Errors
    ///
    /// Whatever the underlying operation returns.
    pub fn apply(
        &mut self,
        action: InventoryAction,
        count: u32,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        match action {
            InventoryAction::Reserve => self.reserve_rooms(count, now),
            InventoryAction::Release => self.release_rooms(count, now),
            InventoryAction::Block => self.block_rooms(count, reason.unwrap_or_default(), now),
            InventoryAction::Unblock => self.unblock_rooms(count, now),
        }
    }

    fn ensure_positive(count: u32) -> Result<(), DomainError> {
        if count == 0 {
            Err(DomainError::validation("room count must be positive"))
        } else {
            Ok(())
        }
    }

    fn ensure_capacity(&self, count: u32) -> Result<(), DomainError> {
        if self.can_accommodate(count) {
            Ok(())
        } else {
            Err(DomainError::InsufficientCapacity {
                room_type_id: self.room_type_id.clone(),
                date: self.date,
                requested: count,
                available: self.headroom(),
            })
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.last_updated = now;
        self.version = self.version.next();
    }
}

impl Aggregate for Availability {
    type Id = AvailabilityKey;
    const KIND: &'static str = "Availability";

    fn id(&self) -> AvailabilityKey {
        self.key()
    }

    fn version(&self) -> Version {
        self.version
    }
}
