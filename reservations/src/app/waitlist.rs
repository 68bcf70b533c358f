//! Waitlist service.
//!
//! Guests join the waitlist explicitly after a booking attempt failed with
//! `RoomsUnavailable`. When rooms are released the reservation service calls
//! [`WaitlistService::notify_for_release`], which marks matching entries as
//! notified. Turning an entry into a booking stays an explicit caller action
//! ([`WaitlistService::convert_to_reservation`]).

use super::commands::AddToWaitlist;
use super::error::ServiceError;
use super::publish_event;
use crate::aggregates::{NewWaitlistEntry, WaitlistEntry, sort_for_notification};
use crate::config::WaitlistPolicy;
use crate::error::DomainError;
use crate::events::HotelEvent;
use crate::repository::{ReservationRepository, WaitlistRepository};
use crate::types::{DateRange, GuestId, Priority, ReservationId, RoomTypeId, WaitlistId};
use chrono::{DateTime, Utc};
use hotel_core::environment::Clock;
use hotel_core::event_bus::EventPublisher;
use hotel_runtime::KeyedLocks;
use hotel_runtime::metrics::WaitlistMetrics;
use std::sync::Arc;

/// Coordinates [`WaitlistEntry`] operations.
pub struct WaitlistService {
    repository: Arc<dyn WaitlistRepository>,
    reservations: Arc<dyn ReservationRepository>,
    locks: KeyedLocks<WaitlistId>,
    clock: Arc<dyn Clock>,
    publisher: Arc<dyn EventPublisher>,
    policy: WaitlistPolicy,
}

impl WaitlistService {
    /// Create a service over `repository`. `reservations` is used to check
    /// conversion targets.
    #[must_use]
    pub fn new(
        repository: Arc<dyn WaitlistRepository>,
        reservations: Arc<dyn ReservationRepository>,
        clock: Arc<dyn Clock>,
        publisher: Arc<dyn EventPublisher>,
        policy: WaitlistPolicy,
    ) -> Self {
        Self {
            repository,
            reservations,
            locks: KeyedLocks::new(),
            clock,
            publisher,
            policy,
        }
    }

    /// Queue a guest.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Domain`] when the stay starts in the past
    /// - [`ServiceError::Storage`] if the repository failed
    #[tracing::instrument(skip(self, command), fields(guest_id = %command.guest_id, room_type_id = %command.room_type_id))]
    pub async fn add_to_waitlist(&self, command: AddToWaitlist) -> Result<WaitlistEntry, ServiceError> {
        let entry = WaitlistEntry::add(
            NewWaitlistEntry {
                guest_id: command.guest_id,
                room_type_id: command.room_type_id,
                date_range: command.date_range,
                guest_count: command.guest_count,
                priority: command.priority,
                notes: command.notes,
            },
            self.clock.now(),
            self.policy.expiry(),
        )?;
        self.repository.save(&entry).await?;

        WaitlistMetrics::record_added();
        publish_event(self.publisher.as_ref(), &HotelEvent::waitlist_entry_created(&entry)).await;
        tracing::info!(waitlist_id = %entry.id(), priority = %entry.priority(), "Added to waitlist");
        Ok(entry)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Load an entry.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] for an unknown id.
    pub async fn get_entry(&self, id: WaitlistId) -> Result<WaitlistEntry, ServiceError> {
        Ok(self.repository.find_by_id(&id).await?)
    }

    /// Every entry of a guest, oldest first.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Storage`] if the repository failed.
    pub async fn find_by_guest(&self, guest_id: GuestId) -> Result<Vec<WaitlistEntry>, ServiceError> {
        Ok(self.repository.find_by_guest(guest_id).await?)
    }

    /// Every ACTIVE entry, in notification order.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Storage`] if the repository failed.
    pub async fn active_entries(&self) -> Result<Vec<WaitlistEntry>, ServiceError> {
        let mut entries = self.repository.find_active().await?;
        sort_for_notification(&mut entries, self.clock.now());
        Ok(entries)
    }

    /// ACTIVE entries for a room type, in notification order.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Storage`] if the repository failed.
    pub async fn room_waitlist(&self, room_type_id: &RoomTypeId) -> Result<Vec<WaitlistEntry>, ServiceError> {
        let mut entries = self.repository.find_active_by_room_type(room_type_id).await?;
        sort_for_notification(&mut entries, self.clock.now());
        Ok(entries)
    }

    /// ACTIVE entries never notified or last notified at least one reminder
    /// interval ago, in notification order.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Storage`] if the repository failed.
    pub async fn entries_to_notify(&self) -> Result<Vec<WaitlistEntry>, ServiceError> {
        let now = self.clock.now();
        let reminder = self.policy.reminder_interval();
        let mut entries: Vec<_> = self
            .repository
            .find_active()
            .await?
            .into_iter()
            .filter(|entry| entry.should_notify_again(now, reminder))
            .collect();
        sort_for_notification(&mut entries, now);
        Ok(entries)
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Record that the guest was told rooms are available.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] or [`ServiceError::Domain`] (entry not ACTIVE).
    pub async fn mark_notified(&self, id: WaitlistId) -> Result<WaitlistEntry, ServiceError> {
        let entry = self
            .update(id, "mark_notified", |entry, now| entry.mark_notified(now))
            .await?;
        WaitlistMetrics::record_notified(1);
        self.publish(HotelEvent::WaitlistNotified {
            waitlist_id: id,
            occurred_at: entry.modified_at(),
        })
        .await;
        Ok(entry)
    }

    /// Raise an entry's priority.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`], or [`ServiceError::Domain`] when the entry is
    /// not ACTIVE or the priority does not increase.
    pub async fn upgrade_priority(&self, id: WaitlistId, priority: Priority) -> Result<WaitlistEntry, ServiceError> {
        let mut previous = None;
        let entry = self
            .update(id, "upgrade_priority", |entry, now| {
                previous = Some(entry.priority());
                entry.upgrade_priority(priority, now)
            })
            .await?;
        if let Some(from) = previous {
            self.publish(HotelEvent::PriorityUpgraded {
                waitlist_id: id,
                from,
                to: priority,
                occurred_at: entry.modified_at(),
            })
            .await;
        }
        Ok(entry)
    }

    /// Push an entry's expiry back.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`], or [`ServiceError::Domain`] when the entry is
    /// not ACTIVE or `additional_days` is zero.
    pub async fn extend_expiry(&self, id: WaitlistId, additional_days: u32) -> Result<WaitlistEntry, ServiceError> {
        self.update(id, "extend_expiry", |entry, now| {
            entry.extend_expiry(additional_days, now)
        })
        .await
    }

    /// ACTIVE → EXPIRED.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] or [`ServiceError::Domain`] (entry not ACTIVE).
    pub async fn expire_entry(&self, id: WaitlistId) -> Result<WaitlistEntry, ServiceError> {
        let entry = self
            .update(id, "expire", |entry, now| entry.expire(now))
            .await?;
        self.publish(HotelEvent::WaitlistExpired {
            waitlist_id: id,
            occurred_at: entry.modified_at(),
        })
        .await;
        Ok(entry)
    }

    /// ACTIVE → CANCELLED.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] or [`ServiceError::Domain`] (entry not ACTIVE).
    pub async fn cancel_entry(&self, id: WaitlistId) -> Result<WaitlistEntry, ServiceError> {
        let entry = self
            .update(id, "cancel", |entry, now| entry.cancel(now))
            .await?;
        self.publish(HotelEvent::WaitlistCancelled {
            waitlist_id: id,
            occurred_at: entry.modified_at(),
        })
        .await;
        Ok(entry)
    }

    /// ACTIVE → CONVERTED, pointing at an existing reservation.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] for an unknown entry or reservation, or
    /// [`ServiceError::Domain`] when the entry is not ACTIVE.
    pub async fn convert_to_reservation(
        &self,
        id: WaitlistId,
        reservation_id: ReservationId,
    ) -> Result<WaitlistEntry, ServiceError> {
        self.reservations.find_by_id(&reservation_id).await?;
        let entry = self
            .update(id, "convert", |entry, now| {
                entry.convert_to_reservation(reservation_id, now)
            })
            .await?;
        self.publish(HotelEvent::WaitlistConverted {
            waitlist_id: id,
            reservation_id,
            occurred_at: entry.modified_at(),
        })
        .await;
        Ok(entry)
    }

    /// Expire every ACTIVE entry whose window has passed. Meant to be called by
    /// an external scheduler. Returns the expired ids.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Storage`] if the active entries could not be listed.
    /// Failures on individual entries are logged and skipped.
    pub async fn expire_overdue(&self) -> Result<Vec<WaitlistId>, ServiceError> {
        let now = self.clock.now();
        let overdue: Vec<WaitlistId> = self
            .repository
            .find_active()
            .await?
            .into_iter()
            .filter(|entry| entry.is_overdue(now))
            .map(|entry| entry.id())
            .collect();

        let mut expired = Vec::with_capacity(overdue.len());
        for id in overdue {
            match self.expire_entry(id).await {
                Ok(_) => expired.push(id),
                Err(err) => tracing::warn!(waitlist_id = %id, error = %err, "Could not expire entry"),
            }
        }

        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "Expired overdue waitlist entries");
        }
        Ok(expired)
    }

    /// Mark every ACTIVE entry that wants `room_type_id` on a night of `range`
    /// as notified, in notification order. Returns the notified ids.
    ///
    /// Called after rooms were released. Failures are logged and never
    /// propagate, since the release itself has already been committed.
    #[tracing::instrument(skip(self))]
    pub async fn notify_for_release(&self, room_type_id: &RoomTypeId, range: &DateRange) -> Vec<WaitlistId> {
        let now = self.clock.now();
        let mut candidates: Vec<WaitlistEntry> = match self.repository.find_active_by_room_type(room_type_id).await {
            Ok(entries) => entries
                .into_iter()
                .filter(|entry| entry.wants(room_type_id, range))
                .collect(),
            Err(err) => {
                tracing::warn!(error = %err, "Could not load waitlist for released rooms");
                return Vec::new();
            }
        };
        sort_for_notification(&mut candidates, now);

        let mut notified = Vec::with_capacity(candidates.len());
        for entry in candidates {
            match self.mark_notified(entry.id()).await {
                Ok(_) => notified.push(entry.id()),
                Err(err) => {
                    tracing::warn!(waitlist_id = %entry.id(), error = %err, "Could not notify waitlist entry");
                }
            }
        }
        notified
    }

    async fn update<F>(&self, id: WaitlistId, operation: &'static str, apply: F) -> Result<WaitlistEntry, ServiceError>
    where
        F: FnOnce(&mut WaitlistEntry, DateTime<Utc>) -> Result<(), DomainError>,
    {
        let _guard = self.locks.lock(id).await;
        let mut entry = self.repository.find_by_id(&id).await?;
        if let Err(err) = apply(&mut entry, self.clock.now()) {
            tracing::warn!(waitlist_id = %id, operation, error = %err, "Waitlist operation rejected");
            return Err(err.into());
        }
        self.repository.save(&entry).await?;
        tracing::info!(waitlist_id = %id, operation, status = %entry.status(), "Waitlist entry updated");
        Ok(entry)
    }

    async fn publish(&self, event: HotelEvent) {
        publish_event(self.publisher.as_ref(), &event).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryReservationRepository, InMemoryWaitlistRepository};
    use crate::types::GuestCount;
    use chrono::{Duration, NaiveDate};
    use hotel_testing::{InMemoryEventBus, ManualClock, test_clock};

    struct Fixture {
        service: WaitlistService,
        clock: ManualClock,
        bus: InMemoryEventBus,
    }

    fn fixture() -> Fixture {
        let clock = ManualClock::new(test_clock().now());
        let bus = InMemoryEventBus::new();
        let service = WaitlistService::new(
            Arc::new(InMemoryWaitlistRepository::new()),
            Arc::new(InMemoryReservationRepository::new()),
            Arc::new(clock.clone()),
            Arc::new(bus.clone()),
            WaitlistPolicy::default(),
        );
        Fixture { service, clock, bus }
    }

    fn stay(from: u32, to: u32) -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2025, 1, from).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, to).unwrap(),
        )
        .unwrap()
    }

    fn request(room: &str, range: DateRange, priority: Priority) -> AddToWaitlist {
        AddToWaitlist::new(GuestId::new(), RoomTypeId::new(room), range, GuestCount::new(2, 0).unwrap())
            .with_priority(priority)
    }

    #[tokio::test]
    async fn test_notify_for_release_marks_overlapping_entries() {
        let f = fixture();
        let wanted = f
            .service
            .add_to_waitlist(request("DELUXE_001", stay(10, 12), Priority::Low))
            .await
            .unwrap();
        let other_dates = f
            .service
            .add_to_waitlist(request("DELUXE_001", stay(20, 22), Priority::High))
            .await
            .unwrap();
        let other_room = f
            .service
            .add_to_waitlist(request("SUITE_001", stay(10, 12), Priority::High))
            .await
            .unwrap();

        let notified = f
            .service
            .notify_for_release(&RoomTypeId::new("DELUXE_001"), &stay(11, 14))
            .await;
        assert_eq!(notified, vec![wanted.id()]);

        let entry = f.service.get_entry(wanted.id()).await.unwrap();
        assert!(entry.notified());
        assert!(entry.is_active());
        assert!(!f.service.get_entry(other_dates.id()).await.unwrap().notified());
        assert!(!f.service.get_entry(other_room.id()).await.unwrap().notified());
        assert_eq!(f.bus.events_of_type("WaitlistNotified.v1").len(), 1);
    }

    #[tokio::test]
    async fn test_room_waitlist_is_ordered_by_score() {
        let f = fixture();
        let first = f
            .service
            .add_to_waitlist(request("DELUXE_001", stay(10, 12), Priority::Medium))
            .await
            .unwrap();
        f.clock.advance(Duration::hours(1));
        let urgent = f
            .service
            .add_to_waitlist(request("DELUXE_001", stay(10, 12), Priority::Urgent))
            .await
            .unwrap();
        f.clock.advance(Duration::hours(1));
        let second = f
            .service
            .add_to_waitlist(request("DELUXE_001", stay(10, 12), Priority::Medium))
            .await
            .unwrap();

        let ids: Vec<_> = f
            .service
            .room_waitlist(&RoomTypeId::new("DELUXE_001"))
            .await
            .unwrap()
            .iter()
            .map(WaitlistEntry::id)
            .collect();
        assert_eq!(ids, vec![urgent.id(), first.id(), second.id()]);
    }

    #[tokio::test]
    async fn test_expire_overdue_only_touches_past_window() {
        let f = fixture();
        let old = f
            .service
            .add_to_waitlist(request("DELUXE_001", stay(10, 12), Priority::Low))
            .await
            .unwrap();
        f.clock.advance(Duration::hours(24));
        let fresh = f
            .service
            .add_to_waitlist(request("DELUXE_001", stay(10, 12), Priority::Low))
            .await
            .unwrap();
        f.clock.advance(Duration::hours(25));

        let expired = f.service.expire_overdue().await.unwrap();
        assert_eq!(expired, vec![old.id()]);
        assert!(f.service.get_entry(fresh.id()).await.unwrap().is_active());
        assert_eq!(f.bus.events_of_type("WaitlistExpired.v1").len(), 1);
    }

    #[tokio::test]
    async fn test_convert_requires_existing_reservation() {
        let f = fixture();
        let entry = f
            .service
            .add_to_waitlist(request("DELUXE_001", stay(10, 12), Priority::Low))
            .await
            .unwrap();
        let err = f
            .service
            .convert_to_reservation(entry.id(), ReservationId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { kind: "Reservation", .. }));
        assert!(f.service.get_entry(entry.id()).await.unwrap().is_active());
    }

    #[tokio::test]
    async fn test_entries_to_notify_respects_reminder_interval() {
        let f = fixture();
        let entry = f
            .service
            .add_to_waitlist(request("DELUXE_001", stay(20, 22), Priority::Low))
            .await
            .unwrap();
        f.service.mark_notified(entry.id()).await.unwrap();
        assert!(f.service.entries_to_notify().await.unwrap().is_empty());

        f.service.extend_expiry(entry.id(), 5).await.unwrap();
        f.clock.advance(Duration::days(3));
        assert_eq!(f.service.entries_to_notify().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upgrade_priority_publishes_both_levels() {
        let f = fixture();
        let entry = f
            .service
            .add_to_waitlist(request("DELUXE_001", stay(10, 12), Priority::Low))
            .await
            .unwrap();
        f.service
            .upgrade_priority(entry.id(), Priority::High)
            .await
            .unwrap();
        let err = f
            .service
            .upgrade_priority(entry.id(), Priority::Medium)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::InvalidPriority { .. })));

        let events = f.bus.events_of_type("PriorityUpgraded.v1");
        assert_eq!(events.len(), 1);
        let decoded: HotelEvent = events[0].decode().unwrap();
        assert!(matches!(
            decoded,
            HotelEvent::PriorityUpgraded { from: Priority::Low, to: Priority::High, .. }
        ));
    }
}
