//! Repository ports for the three aggregates.
//!
//! Each port extends the generic [`Repository`] contract from `hotel-core`
//! (`save`, `find_by_id`, `find_all` with optimistic concurrency) with the
//! finders the coordination layer needs. Services hold them as trait objects
//! so storage can be swapped without touching domain code.

use crate::aggregates::{Availability, Reservation, WaitlistEntry};
use crate::types::{AvailabilityKey, ConfirmationCode, DateRange, GuestId, RoomTypeId};
use async_trait::async_trait;
use chrono::NaiveDate;
use hotel_core::repository::{Repository, RepositoryError};

pub mod in_memory;

pub use in_memory::{
    InMemoryAvailabilityRepository, InMemoryReservationRepository, InMemoryWaitlistRepository,
};

/// Storage for [`Availability`] records.
#[async_trait]
pub trait AvailabilityRepository: Repository<Availability> {
    /// Load the record for one room type and night.
    ///
    /// # Errors
    ///
    /// `NotFound` if inventory was never set up for that night.
    async fn find_by_room_type_and_date(
        &self,
        room_type_id: &RoomTypeId,
        date: NaiveDate,
    ) -> Result<Availability, RepositoryError> {
        self.find_by_id(&AvailabilityKey::new(room_type_id.clone(), date))
            .await
    }

    /// Records that exist for the nights of `range`, in date order. Nights
    /// without a record are skipped.
    ///
    /// # Errors
    ///
    /// `Storage` if the backing store failed.
    async fn find_range(
        &self,
        room_type_id: &RoomTypeId,
        range: &DateRange,
    ) -> Result<Vec<Availability>, RepositoryError>;
}

/// Storage for [`Reservation`]s.
#[async_trait]
pub trait ReservationRepository: Repository<Reservation> {
    /// Load a reservation by its human lookup code.
    ///
    /// # Errors
    ///
    /// `NotFound` if no reservation carries the code.
    async fn find_by_confirmation_code(
        &self,
        code: &ConfirmationCode,
    ) -> Result<Reservation, RepositoryError>;

    /// Every reservation of a guest, oldest first.
    ///
    /// # Errors
    ///
    /// `Storage` if the backing store failed.
    async fn find_by_guest(&self, guest_id: GuestId) -> Result<Vec<Reservation>, RepositoryError>;
}

/// Storage for [`WaitlistEntry`]s.
#[async_trait]
pub trait WaitlistRepository: Repository<WaitlistEntry> {
    /// Every entry of a guest, oldest first.
    ///
    /// # Errors
    ///
    /// `Storage` if the backing store failed.
    async fn find_by_guest(&self, guest_id: GuestId)
    -> Result<Vec<WaitlistEntry>, RepositoryError>;

    /// ACTIVE entries for a room type, unordered.
    ///
    /// # Errors
    ///
    /// `Storage` if the backing store failed.
    async fn find_active_by_room_type(
        &self,
        room_type_id: &RoomTypeId,
    ) -> Result<Vec<WaitlistEntry>, RepositoryError>;

    /// Every ACTIVE entry, unordered.
    ///
    /// # Errors
    ///
    /// `Storage` if the backing store failed.
    async fn find_active(&self) -> Result<Vec<WaitlistEntry>, RepositoryError>;
}
