//! Waitlist flow tests.
//!
//! Guests who cannot be booked join the waitlist; released rooms notify the
//! matching entries in priority order. Conversion always stays an explicit
//! call.
//!
//! Run with: `cargo test --test waitlist_flow_test`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

mod common;

use chrono::Duration;
use common::{Hotel, booking, couple, date, deluxe, stay, suite};
use hotel_core::environment::Clock;
use hotel_reservations::app::{AddToWaitlist, HotelServices, Repositories, ServiceError};
use hotel_reservations::config::Config;
use hotel_reservations::error::DomainError;
use hotel_reservations::types::{
    DateRange, GuestId, Priority, ReservationId, RoomTypeId, WaitlistStatus,
};
use hotel_testing::InMemoryEventBus;
use std::sync::Arc;

fn waitlist(room: &RoomTypeId, range: DateRange, priority: Priority) -> AddToWaitlist {
    AddToWaitlist::new(GuestId::new(), room.clone(), range, couple()).with_priority(priority)
}

/// Test 1: Priority Score
///
/// HIGH, waiting two days, not notified: 3020. Notified: 3120.
#[tokio::test]
async fn test_priority_score_grows_with_notification() {
    let hotel = Hotel::open(date(2026, 1, 1));
    let range = stay(date(2026, 2, 1), date(2026, 2, 3));

    let entry = hotel
        .services
        .waitlist
        .add_to_waitlist(waitlist(&deluxe(), range, Priority::High))
        .await
        .unwrap();
    // Keep the entry alive past the default 48 hour window.
    hotel.services.waitlist.extend_expiry(entry.id(), 5).await.unwrap();

    hotel.clock.advance(Duration::days(2));
    let now = hotel.clock.now();
    let entry = hotel.services.waitlist.get_entry(entry.id()).await.unwrap();
    assert_eq!(entry.priority_score(now), 3020);

    let notified = hotel.services.waitlist.mark_notified(entry.id()).await.unwrap();
    assert!(notified.notified());
    assert_eq!(notified.notified_at(), Some(now));
    assert_eq!(notified.priority_score(now), 3120);
}

/// Test 2: Released Rooms Notify the Waitlist
///
/// Cancelling notifies the ACTIVE entries for the same room type whose stays
/// overlap, highest priority first. Nobody is converted.
#[tokio::test]
async fn test_cancellation_notifies_matching_entries() {
    let hotel = Hotel::open(date(2026, 3, 1));
    let room = deluxe();
    hotel.open_inventory(&room, date(2026, 3, 10), date(2026, 3, 14), 1, 0).await;
    let range = stay(date(2026, 3, 10), date(2026, 3, 12));

    let reservation = hotel
        .services
        .reservations
        .create_reservation(booking(&room, range))
        .await
        .unwrap();
    let err = hotel
        .services
        .reservations
        .create_reservation(booking(&room, range))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::RoomsUnavailable { .. }));

    let service = &hotel.services.waitlist;
    let low = service
        .add_to_waitlist(waitlist(&room, range, Priority::Low))
        .await
        .unwrap();
    let urgent = service
        .add_to_waitlist(waitlist(&room, stay(date(2026, 3, 11), date(2026, 3, 13)), Priority::Urgent))
        .await
        .unwrap();
    let other_room = service
        .add_to_waitlist(waitlist(&suite(), range, Priority::Urgent))
        .await
        .unwrap();
    let later_stay = service
        .add_to_waitlist(waitlist(&room, stay(date(2026, 3, 12), date(2026, 3, 14)), Priority::High))
        .await
        .unwrap();
    let withdrawn = service
        .add_to_waitlist(waitlist(&room, range, Priority::High))
        .await
        .unwrap();
    service.cancel_entry(withdrawn.id()).await.unwrap();

    let outcome = hotel
        .services
        .reservations
        .cancel_reservation(reservation.id(), "Guest request")
        .await
        .unwrap();
    assert_eq!(outcome.notified_waitlist, vec![urgent.id(), low.id()]);

    for id in [urgent.id(), low.id()] {
        let entry = service.get_entry(id).await.unwrap();
        assert!(entry.notified());
        assert_eq!(entry.status(), WaitlistStatus::Active);
    }
    for id in [other_room.id(), later_stay.id()] {
        assert!(!service.get_entry(id).await.unwrap().notified());
    }
    assert_eq!(
        service.get_entry(withdrawn.id()).await.unwrap().status(),
        WaitlistStatus::Cancelled
    );
    assert_eq!(hotel.events.events_of_type("WaitlistNotified.v1").len(), 2);
}

/// Test 3: Converting an Entry
///
/// After a notification the guest books and the entry is converted
/// explicitly.
#[tokio::test]
async fn test_conversion_is_explicit() {
    let hotel = Hotel::open(date(2026, 4, 1));
    let room = deluxe();
    hotel.open_inventory(&room, date(2026, 4, 10), date(2026, 4, 10), 1, 0).await;
    let range = stay(date(2026, 4, 10), date(2026, 4, 11));
    let service = &hotel.services.waitlist;

    let first = hotel
        .services
        .reservations
        .create_reservation(booking(&room, range))
        .await
        .unwrap();
    let entry = service
        .add_to_waitlist(waitlist(&room, range, Priority::Medium))
        .await
        .unwrap();

    hotel
        .services
        .reservations
        .cancel_reservation(first.id(), "Guest request")
        .await
        .unwrap();

    let mut command = booking(&room, range);
    command.guest_id = entry.guest_id();
    let second = hotel
        .services
        .reservations
        .create_reservation(command)
        .await
        .unwrap();

    let err = service
        .convert_to_reservation(entry.id(), ReservationId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { kind: "Reservation", .. }));

    let converted = service
        .convert_to_reservation(entry.id(), second.id())
        .await
        .unwrap();
    assert_eq!(converted.status(), WaitlistStatus::Converted);
    assert_eq!(converted.converted_reservation_id(), Some(second.id()));
    assert!(!converted.wants(&room, &range));

    let err = service
        .convert_to_reservation(entry.id(), second.id())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Domain(DomainError::InvalidTransition { from: "CONVERTED", .. })
    ));
    assert!(service.active_entries().await.unwrap().is_empty());
}

/// Test 4: Expiry Sweep
///
/// Entries past their window are expired by the sweep; others are left alone.
#[tokio::test]
async fn test_expire_overdue_entries() {
    let hotel = Hotel::open(date(2026, 5, 1));
    let range = stay(date(2026, 6, 1), date(2026, 6, 2));
    let service = &hotel.services.waitlist;

    let stale = service
        .add_to_waitlist(waitlist(&deluxe(), range, Priority::Medium))
        .await
        .unwrap();
    let extended = service
        .add_to_waitlist(waitlist(&deluxe(), range, Priority::Medium))
        .await
        .unwrap();
    service.extend_expiry(extended.id(), 3).await.unwrap();

    hotel.clock.advance(Duration::hours(47));
    assert!(service.expire_overdue().await.unwrap().is_empty());

    hotel.clock.advance(Duration::hours(2));
    let expired = service.expire_overdue().await.unwrap();
    assert_eq!(expired, vec![stale.id()]);

    assert_eq!(
        service.get_entry(stale.id()).await.unwrap().status(),
        WaitlistStatus::Expired
    );
    assert_eq!(
        service.get_entry(extended.id()).await.unwrap().status(),
        WaitlistStatus::Active
    );
    assert_eq!(hotel.events.events_of_type("WaitlistExpired.v1").len(), 1);
}

/// Test 5: Priority Only Goes Up
#[tokio::test]
async fn test_priority_upgrade_is_monotonic() {
    let hotel = Hotel::open(date(2026, 5, 1));
    let range = stay(date(2026, 6, 1), date(2026, 6, 2));
    let service = &hotel.services.waitlist;

    let entry = service
        .add_to_waitlist(waitlist(&deluxe(), range, Priority::Medium))
        .await
        .unwrap();

    let upgraded = service.upgrade_priority(entry.id(), Priority::High).await.unwrap();
    assert_eq!(upgraded.priority(), Priority::High);

    for lower_or_equal in [Priority::High, Priority::Low] {
        let err = service
            .upgrade_priority(entry.id(), lower_or_equal)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::InvalidPriority {
                current: Priority::High,
                ..
            })
        ));
    }
    assert_eq!(hotel.events.events_of_type("PriorityUpgraded.v1").len(), 1);
}

/// Test 6: Reminders and Lookups
#[tokio::test]
async fn test_reminders_and_lookups() {
    let hotel = Hotel::open(date(2026, 5, 1));
    let range = stay(date(2026, 7, 1), date(2026, 7, 3));
    let service = &hotel.services.waitlist;

    let command = waitlist(&deluxe(), range, Priority::Low).with_notes("Sea view if possible");
    let guest_id = command.guest_id;
    let entry = service.add_to_waitlist(command).await.unwrap();
    service.extend_expiry(entry.id(), 30).await.unwrap();
    assert_eq!(entry.notes(), Some("Sea view if possible"));

    let due: Vec<_> = service.entries_to_notify().await.unwrap().iter().map(|e| e.id()).collect();
    assert_eq!(due, vec![entry.id()]);

    service.mark_notified(entry.id()).await.unwrap();
    assert!(service.entries_to_notify().await.unwrap().is_empty());

    // Default reminder interval is three days.
    hotel.clock.advance(Duration::days(3));
    assert_eq!(service.entries_to_notify().await.unwrap().len(), 1);

    assert_eq!(service.find_by_guest(guest_id).await.unwrap().len(), 1);
    assert_eq!(service.room_waitlist(&deluxe()).await.unwrap().len(), 1);
    assert!(service.room_waitlist(&suite()).await.unwrap().is_empty());
}

/// Test 7: Stays in the Past
#[tokio::test]
async fn test_waitlist_rejects_past_stays() {
    let hotel = Hotel::open(date(2026, 5, 10));
    let err = hotel
        .services
        .waitlist
        .add_to_waitlist(waitlist(&deluxe(), stay(date(2026, 5, 9), date(2026, 5, 11)), Priority::Urgent))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    assert!(hotel.events.is_empty());
}

/// Test 8: Expiry Outside the Calendar
///
/// An extension or configured window too large for the calendar is a
/// validation error and leaves the stored entry untouched.
#[tokio::test]
async fn test_unrepresentable_expiry_is_rejected() {
    let hotel = Hotel::open(date(2026, 5, 1));
    let range = stay(date(2026, 6, 1), date(2026, 6, 2));
    let service = &hotel.services.waitlist;

    let entry = service
        .add_to_waitlist(waitlist(&deluxe(), range, Priority::Medium))
        .await
        .unwrap();
    let err = service.extend_expiry(entry.id(), u32::MAX).await.unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    assert_eq!(service.get_entry(entry.id()).await.unwrap(), entry);

    let config = Config::from_lookup(|key| match key {
        "HOTEL_WAITLIST_EXPIRY_HOURS" => Some(u32::MAX.to_string()),
        _ => None,
    });
    let services = HotelServices::new(
        Repositories::in_memory(),
        &config,
        Arc::new(hotel.clock.clone()),
        Arc::new(InMemoryEventBus::new()),
        Arc::new(common::standard_rates()),
    );
    let err = services
        .waitlist
        .add_to_waitlist(waitlist(&deluxe(), range, Priority::Medium))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    assert!(services.waitlist.active_entries().await.unwrap().is_empty());
}
