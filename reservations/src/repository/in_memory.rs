//! In-memory adapters for the repository ports.
//!
//! The generic [`InMemoryStore`] already implements the base
//! [`Repository`](hotel_core::Repository) contract; the finders below are
//! linear scans over it.

use super::{AvailabilityRepository, ReservationRepository, WaitlistRepository};
use crate::aggregates::{Availability, Reservation, WaitlistEntry};
use crate::types::{ConfirmationCode, DateRange, GuestId, RoomTypeId};
use async_trait::async_trait;
use hotel_core::repository::RepositoryError;
use hotel_runtime::InMemoryStore;

/// In-memory availability storage
pub type InMemoryAvailabilityRepository = InMemoryStore<Availability>;

/// In-memory reservation storage
pub type InMemoryReservationRepository = InMemoryStore<Reservation>;

/// In-memory waitlist storage
pub type InMemoryWaitlistRepository = InMemoryStore<WaitlistEntry>;

#[async_trait]
impl AvailabilityRepository for InMemoryStore<Availability> {
    async fn find_range(
        &self,
        room_type_id: &RoomTypeId,
        range: &DateRange,
    ) -> Result<Vec<Availability>, RepositoryError> {
        Ok(self
            .filter(|availability| {
                availability.room_type_id() == room_type_id && range.contains(availability.date())
            })
            .await)
    }
}

#[async_trait]
impl ReservationRepository for InMemoryStore<Reservation> {
    async fn find_by_confirmation_code(
        &self,
        code: &ConfirmationCode,
    ) -> Result<Reservation, RepositoryError> {
        self.filter(|reservation| reservation.confirmation_code() == code)
            .await
            .into_iter()
            .next()
            .ok_or_else(|| RepositoryError::NotFound {
                kind: "Reservation",
                id: code.to_string(),
            })
    }

    async fn find_by_guest(&self, guest_id: GuestId) -> Result<Vec<Reservation>, RepositoryError> {
        let mut reservations = self
            .filter(|reservation| reservation.guest_id() == guest_id)
            .await;
        reservations.sort_by_key(Reservation::created_at);
        Ok(reservations)
    }
}

#[async_trait]
impl WaitlistRepository for InMemoryStore<WaitlistEntry> {
    async fn find_by_guest(
        &self,
        guest_id: GuestId,
    ) -> Result<Vec<WaitlistEntry>, RepositoryError> {
        let mut entries = self.filter(|entry| entry.guest_id() == guest_id).await;
        entries.sort_by_key(WaitlistEntry::created_at);
        Ok(entries)
    }

    async fn find_active_by_room_type(
        &self,
        room_type_id: &RoomTypeId,
    ) -> Result<Vec<WaitlistEntry>, RepositoryError> {
        Ok(self
            .filter(|entry| entry.is_active() && entry.room_type_id() == room_type_id)
            .await)
    }

    async fn find_active(&self) -> Result<Vec<WaitlistEntry>, RepositoryError> {
        Ok(self.filter(WaitlistEntry::is_active).await)
    }
}
