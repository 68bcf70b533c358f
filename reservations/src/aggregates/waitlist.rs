//! Waitlist aggregate: a guest queued for a sold-out stay.
//!
//! Entries start ACTIVE and end in exactly one of CONVERTED, EXPIRED or
//! CANCELLED. Being notified does not change the status; the guest still has
//! to book (conversion) before the entry expires.

use crate::error::DomainError;
use crate::types::{
    DateRange, GuestCount, GuestId, Priority, ReservationId, RoomTypeId, WaitlistId,
    WaitlistStatus,
};
use chrono::{DateTime, Duration, Utc};
use hotel_core::{Aggregate, Version};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

const KIND: &str = "WaitlistEntry";

/// Input for [`WaitlistEntry::add`].
#[derive(Clone, Debug)]
pub struct NewWaitlistEntry {
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

/// A queued request for rooms.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistEntry {
    id: WaitlistId,
    guest_id: GuestId,
    room_type_id: RoomTypeId,
    date_range: DateRange,
    guest_count: GuestCount,
    priority: Priority,
    status: WaitlistStatus,
    notes: Option<String>,
    expires_at: DateTime<Utc>,
    notified: bool,
    notified_at: Option<DateTime<Utc>>,
    converted_reservation_id: Option<ReservationId>,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
    version: Version,
}

impl WaitlistEntry {
    /// Queue a guest; the entry expires `expiry` after `now`.
    ///
    /// # Errors
    ///
    /// [`DomainError::Validation`] when the stay starts in the past or the
    /// expiry lies beyond the representable calendar.
    pub fn add(
        new: NewWaitlistEntry,
        now: DateTime<Utc>,
        expiry: Duration,
    ) -> Result<Self, DomainError> {
        if new.date_range.check_in() < now.date_naive() {
            return Err(DomainError::validation(format!(
                "check-in date {} is in the past",
                new.date_range.check_in()
            )));
        }
        let expires_at = now
            .checked_add_signed(expiry)
            .ok_or_else(|| DomainError::validation("waitlist expiry is out of range"))?;
        Ok(Self {
            id: WaitlistId::new(),
            guest_id: new.guest_id,
            room_type_id: new.room_type_id,
            date_range: new.date_range,
            guest_count: new.guest_count,
            priority: new.priority,
            status: WaitlistStatus::Active,
            notes: new.notes,
            expires_at,
            notified: false,
            notified_at: None,
            converted_reservation_id: None,
            created_at: now,
            modified_at: now,
            version: Version::FIRST,
        })
    }

    /// Identity
    #[must_use]
    pub const fn id(&self) -> WaitlistId {
        self.id
    }

    /// Waiting guest
    #[must_use]
    pub const fn guest_id(&self) -> GuestId {
        self.guest_id
    }

    /// Wanted room type
    #[must_use]
    pub const fn room_type_id(&self) -> &RoomTypeId {
        &self.room_type_id
    }

    /// Wanted stay
    #[must_use]
    pub const fn date_range(&self) -> &DateRange {
        &self.date_range
    }

    /// Occupants
    #[must_use]
    pub const fn guest_count(&self) -> GuestCount {
        self.guest_count
    }

    /// Queue priority
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Lifecycle status
    #[must_use]
    pub const fn status(&self) -> WaitlistStatus {
        self.status
    }

    /// Free-text notes
    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// End of the waiting window
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the guest has been told rooms freed up
    #[must_use]
    pub const fn notified(&self) -> bool {
        self.notified
    }

    /// Most recent notification
    #[must_use]
    pub const fn notified_at(&self) -> Option<DateTime<Utc>> {
        self.notified_at
    }

    /// Reservation the entry was converted into
    #[must_use]
    pub const fn converted_reservation_id(&self) -> Option<ReservationId> {
        self.converted_reservation_id
    }

    /// When the guest joined the queue
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time of the last mutation
    #[must_use]
    pub const fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }

    /// Still waiting
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == WaitlistStatus::Active
    }

    /// The waiting window has passed
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Ranking used to order notifications:
    /// `priority × 1000 + whole days waiting × 10 + 100 if notified`.
    #[must_use]
    pub fn priority_score(&self, now: DateTime<Utc>) -> i64 {
        let days_waiting = (now - self.created_at).num_days().max(0);
        let notified_bonus = if self.notified { 100 } else { 0 };
        i64::from(self.priority.value()) * 1000 + days_waiting * 10 + notified_bonus
    }

    /// An active entry that has never been notified, or whose last notice is at
    /// least `reminder_interval` old.
    #[must_use]
    pub fn should_notify_again(&self, now: DateTime<Utc>, reminder_interval: Duration) -> bool {
        self.is_active()
            && self
                .notified_at
                .is_none_or(|notified_at| now - notified_at >= reminder_interval)
    }

    /// Whether rooms freed for `room_type_id` over `range` are of interest.
    #[must_use]
    pub fn wants(&self, room_type_id: &RoomTypeId, range: &DateRange) -> bool {
        self.is_active() && &self.room_type_id == room_type_id && self.date_range.overlaps(range)
    }

    /// Record that the guest was told rooms are available.
    ///
    /// # Errors
    ///
    /// [`DomainError::InvalidTransition`] unless ACTIVE.
    pub fn mark_notified(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.ensure_active("NOTIFIED")?;
        self.notified = true;
        self.notified_at = Some(now);
        self.touch(now);
        Ok(())
    }

    /// Raise the priority.
    ///
    /// # Errors
    ///
    /// - [`DomainError::InvalidTransition`] unless ACTIVE
    /// - [`DomainError::InvalidPriority`] unless `priority` is higher than the current one
    pub fn upgrade_priority(&mut self, priority: Priority, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.ensure_active("PRIORITY_UPGRADED")?;
        if priority <= self.priority {
            return Err(DomainError::InvalidPriority {
                current: self.priority,
                requested: priority,
            });
        }
        self.priority = priority;
        self.touch(now);
        Ok(())
    }

    /// Push the expiry back by `additional_days`.
    ///
    /// # Errors
    ///
    /// - [`DomainError::InvalidTransition`] unless ACTIVE
    /// - [`DomainError::Validation`] for zero days, or an expiry beyond the
    ///   representable calendar
    pub fn extend_expiry(&mut self, additional_days: u32, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.ensure_active("EXPIRY_EXTENDED")?;
        if additional_days == 0 {
            return Err(DomainError::validation("additional days must be positive"));
        }
        self.expires_at = Duration::try_days(i64::from(additional_days))
            .and_then(|extension| self.expires_at.checked_add_signed(extension))
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "extending expiry by {additional_days} days is out of range"
                ))
            })?;
        self.touch(now);
        Ok(())
    }

    /// ACTIVE → EXPIRED.
    ///
    /// # Errors
    ///
    /// [`DomainError::InvalidTransition`] unless ACTIVE.
    pub fn expire(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.finish(WaitlistStatus::Expired, now)
    }

    /// ACTIVE → CANCELLED.
    ///
    /// # Errors
    ///
    /// [`DomainError::InvalidTransition`] unless ACTIVE.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.finish(WaitlistStatus::Cancelled, now)
    }

    /// ACTIVE → CONVERTED, recording the reservation made for the guest.
    ///
    /// # Errors
    ///
    /// [`DomainError::InvalidTransition`] unless ACTIVE.
    pub fn convert_to_reservation(
        &mut self,
        reservation_id: ReservationId,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.finish(WaitlistStatus::Converted, now)?;
        self.converted_reservation_id = Some(reservation_id);
        Ok(())
    }

    fn finish(&mut self, status: WaitlistStatus, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.ensure_active(status.as_str())?;
        self.status = status;
        self.touch(now);
        Ok(())
    }

    fn ensure_active(&self, to: &'static str) -> Result<(), DomainError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(DomainError::InvalidTransition {
                aggregate: KIND,
                from: self.status.as_str(),
                to,
            })
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.modified_at = now;
        self.version = self.version.next();
    }
}

/// Notification order: higher score first, then whoever joined earlier.
#[must_use]
pub fn notification_order(a: &WaitlistEntry, b: &WaitlistEntry, now: DateTime<Utc>) -> Ordering {
    b.priority_score(now)
        .cmp(&a.priority_score(now))
        .then_with(|| a.created_at.cmp(&b.created_at))
}

/// Sort entries into notification order.
pub fn sort_for_notification(entries: &mut [WaitlistEntry], now: DateTime<Utc>) {
    entries.sort_by(|a, b| notification_order(a, b, now));
}

impl Aggregate for WaitlistEntry {
    type Id = WaitlistId;
    const KIND: &'static str = KIND;

    fn id(&self) -> WaitlistId {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 1, 8, 0, 0).unwrap()
    }

    fn entry_with(priority: Priority, at: DateTime<Utc>) -> WaitlistEntry {
        WaitlistEntry::add(
            NewWaitlistEntry {
                guest_id: GuestId::new(),
                room_type_id: RoomTypeId::new("DELUXE_001"),
                date_range: DateRange::new(
                    NaiveDate::from_ymd_opt(2025, 12, 20).unwrap(),
                    NaiveDate::from_ymd_opt(2025, 12, 22).unwrap(),
                )
                .unwrap(),
                guest_count: GuestCount::new(2, 1).unwrap(),
                priority,
                notes: None,
            },
            at,
            Duration::hours(48),
        )
        .unwrap()
    }

    #[test]
    fn test_add_sets_expiry_window() {
        let entry = entry_with(Priority::Medium, now());
        assert!(entry.is_active());
        assert_eq!(entry.expires_at(), now() + Duration::hours(48));
        assert!(!entry.is_overdue(now() + Duration::hours(48)));
        assert!(entry.is_overdue(now() + Duration::hours(49)));
    }

    #[test]
    fn test_priority_score_counts_days_and_notification() {
        let mut entry = entry_with(Priority::High, now());
        let later = now() + Duration::days(2);
        assert_eq!(entry.priority_score(later), 3020);

        entry.mark_notified(later).unwrap();
        assert_eq!(entry.priority_score(later), 3120);
        assert_eq!(entry.status(), WaitlistStatus::Active);
    }

    #[test]
    fn test_partial_days_do_not_count() {
        let entry = entry_with(Priority::Low, now());
        assert_eq!(entry.priority_score(now() + Duration::hours(47)), 1010);
    }

    #[test]
    fn test_upgrade_priority_is_monotonic() {
        let mut entry = entry_with(Priority::Medium, now());
        assert_eq!(
            entry.upgrade_priority(Priority::Medium, now()),
            Err(DomainError::InvalidPriority {
                current: Priority::Medium,
                requested: Priority::Medium,
            })
        );
        assert!(entry.upgrade_priority(Priority::Low, now()).is_err());
        entry.upgrade_priority(Priority::Urgent, now()).unwrap();
        assert_eq!(entry.priority(), Priority::Urgent);
    }

    #[test]
    fn test_extend_expiry() {
        let mut entry = entry_with(Priority::Low, now());
        entry.extend_expiry(3, now()).unwrap();
        assert_eq!(entry.expires_at(), now() + Duration::hours(48) + Duration::days(3));
        assert!(matches!(
            entry.extend_expiry(0, now()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn test_extend_expiry_beyond_calendar_is_rejected() {
        let mut entry = entry_with(Priority::Low, now());
        let before = entry.clone();
        assert!(matches!(
            entry.extend_expiry(u32::MAX, now()),
            Err(DomainError::Validation(_))
        ));
        assert_eq!(entry, before);
    }

    #[test]
    fn test_add_with_unrepresentable_expiry_is_rejected() {
        let new = NewWaitlistEntry {
            guest_id: GuestId::new(),
            room_type_id: RoomTypeId::new("DELUXE_001"),
            date_range: DateRange::new(
                NaiveDate::from_ymd_opt(2025, 12, 20).unwrap(),
                NaiveDate::from_ymd_opt(2025, 12, 22).unwrap(),
            )
            .unwrap(),
            guest_count: GuestCount::new(2, 0).unwrap(),
            priority: Priority::Low,
            notes: None,
        };
        let result = WaitlistEntry::add(new, now(), Duration::hours(i64::from(u32::MAX)));
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_terminal_states_reject_changes() {
        let mut entry = entry_with(Priority::Low, now());
        let reservation_id = ReservationId::new();
        entry.convert_to_reservation(reservation_id, now()).unwrap();
        assert_eq!(entry.converted_reservation_id(), Some(reservation_id));

        assert_eq!(
            entry.expire(now()),
            Err(DomainError::InvalidTransition {
                aggregate: "WaitlistEntry",
                from: "CONVERTED",
                to: "EXPIRED",
            })
        );
        assert!(entry.mark_notified(now()).is_err());
        assert!(entry.convert_to_reservation(ReservationId::new(), now()).is_err());
        assert!(entry.cancel(now()).is_err());
        assert_eq!(entry.version(), Version::new(2));
    }

    #[test]
    fn test_should_notify_again_after_reminder_interval() {
        let mut entry = entry_with(Priority::Low, now());
        let reminder = Duration::days(3);
        assert!(entry.should_notify_again(now(), reminder));

        entry.mark_notified(now()).unwrap();
        assert!(!entry.should_notify_again(now() + Duration::days(2), reminder));
        assert!(entry.should_notify_again(now() + Duration::days(3), reminder));

        entry.cancel(now()).unwrap();
        assert!(!entry.should_notify_again(now() + Duration::days(10), reminder));
    }

    #[test]
    fn test_notification_order_by_score_then_age() {
        let older = entry_with(Priority::Medium, now());
        let newer = entry_with(Priority::Medium, now() + Duration::hours(1));
        let urgent = entry_with(Priority::Urgent, now() + Duration::hours(2));

        let mut entries = vec![newer.clone(), urgent.clone(), older.clone()];
        sort_for_notification(&mut entries, now() + Duration::hours(3));
        let ids: Vec<_> = entries.iter().map(WaitlistEntry::id).collect();
        assert_eq!(ids, vec![urgent.id(), older.id(), newer.id()]);
    }

    #[test]
    fn test_wants_overlapping_stays_only() {
        let entry = entry_with(Priority::Low, now());
        let room = RoomTypeId::new("DELUXE_001");
        let overlapping = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 12, 21).unwrap(),
            NaiveDate::from_ymd_opt(2025, 12, 25).unwrap(),
        )
        .unwrap();
        let disjoint = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 12, 22).unwrap(),
            NaiveDate::from_ymd_opt(2025, 12, 24).unwrap(),
        )
        .unwrap();
        assert!(entry.wants(&room, &overlapping));
        assert!(!entry.wants(&room, &disjoint));
        assert!(!entry.wants(&RoomTypeId::new("SUITE_001"), &overlapping));
    }
}
