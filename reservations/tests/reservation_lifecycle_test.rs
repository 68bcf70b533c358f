//! Reservation lifecycle tests.
//!
//! Drives reservations through the coordination service and checks that the
//! status machine, refunds and inventory stay in step.
//!
//! Run with: `cargo test --test reservation_lifecycle_test`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

mod common;

use common::{Hotel, booking, date, deluxe, idr, stay};
use hotel_reservations::HotelEvent;
use hotel_reservations::app::ServiceError;
use hotel_reservations::error::DomainError;
use hotel_reservations::types::{RequestType, ReservationStatus};

/// Test 1: Book, Then Cancel the Day Before Arrival
///
/// Two rooms over two nights hold two rooms on both nights; cancelling one day
/// before check-in refunds nothing and frees both nights.
#[tokio::test]
async fn test_book_and_cancel_day_before_arrival() {
    let hotel = Hotel::open(date(2025, 12, 1));
    let room = deluxe();
    hotel
        .open_inventory(&room, date(2025, 12, 10), date(2025, 12, 11), 10, 2)
        .await;
    let range = stay(date(2025, 12, 10), date(2025, 12, 12));

    let reservation = hotel
        .services
        .reservations
        .create_reservation(booking(&room, range).with_room_count(2))
        .await
        .unwrap();

    assert_eq!(reservation.status(), ReservationStatus::Pending);
    assert_eq!(reservation.nights(), 2);
    assert_eq!(reservation.total_amount(), &idr(4_000_000));
    assert_eq!(reservation.confirmation_code().as_str().len(), 8);
    assert_eq!(hotel.reserved(&room, &range).await, vec![2, 2]);

    hotel.go_to(date(2025, 12, 9));
    let outcome = hotel
        .services
        .reservations
        .cancel_reservation(reservation.id(), "Flight cancelled")
        .await
        .unwrap();

    assert_eq!(outcome.refund, idr(0));
    assert_eq!(outcome.reservation.status(), ReservationStatus::Cancelled);
    assert_eq!(outcome.reservation.cancellation_reason(), Some("Flight cancelled"));
    assert!(outcome.notified_waitlist.is_empty());
    assert_eq!(hotel.reserved(&room, &range).await, vec![0, 0]);
}

/// Test 2: Refund Tiers
///
/// A 1,000,000 IDR booking refunds everything 10 days out, half 4 days out
/// and nothing on the day of arrival.
#[tokio::test]
async fn test_refund_tiers() {
    let today = date(2026, 3, 1);
    let cases = [
        (date(2026, 3, 11), idr(1_000_000)),
        (date(2026, 3, 5), idr(500_000)),
        (date(2026, 3, 1), idr(0)),
    ];

    for (check_in, expected_refund) in cases {
        let hotel = Hotel::open(today);
        let room = deluxe();
        hotel.open_inventory(&room, check_in, check_in, 1, 0).await;
        let range = stay(check_in, check_in.succ_opt().unwrap());

        let reservation = hotel
            .services
            .reservations
            .create_reservation(booking(&room, range))
            .await
            .unwrap();
        assert_eq!(reservation.total_amount(), &idr(1_000_000));

        let outcome = hotel
            .services
            .reservations
            .cancel_reservation(reservation.id(), "Guest request")
            .await
            .unwrap();

        assert_eq!(outcome.refund, expected_refund, "check-in {check_in}");
        assert_eq!(outcome.reservation.refund_amount(), Some(&expected_refund));
        assert_eq!(hotel.reserved(&room, &range).await, vec![0]);
    }
}

/// Test 3: Full Stay
///
/// PENDING → CONFIRMED → CHECKED_IN → CHECKED_OUT, rejecting each step taken
/// out of order. Rooms stay held until check-out.
#[tokio::test]
async fn test_full_stay_state_machine() {
    let hotel = Hotel::open(date(2026, 5, 1));
    let room = deluxe();
    hotel
        .open_inventory(&room, date(2026, 5, 3), date(2026, 5, 4), 3, 0)
        .await;
    let range = stay(date(2026, 5, 3), date(2026, 5, 5));
    let reservations = &hotel.services.reservations;

    let reservation = reservations
        .create_reservation(booking(&room, range))
        .await
        .unwrap();
    let id = reservation.id();

    // Check-in from PENDING
    let err = reservations.check_in_guest(id, "301").await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Domain(DomainError::InvalidTransition {
            from: "PENDING",
            to: "CHECKED_IN",
            ..
        })
    ));

    // Confirmation needs payment
    let err = reservations.confirm_reservation(id, false).await.unwrap_err();
    assert_eq!(err, ServiceError::Domain(DomainError::PaymentNotConfirmed));
    let confirmed = reservations.confirm_reservation(id, true).await.unwrap();
    assert_eq!(confirmed.status(), ReservationStatus::Confirmed);

    // Confirming twice
    let err = reservations.confirm_reservation(id, true).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Domain(DomainError::InvalidTransition { from: "CONFIRMED", .. })
    ));

    // Too early to check in
    let err = reservations.check_in_guest(id, "301").await.unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));

    hotel.go_to(date(2026, 5, 3));
    let checked_in = reservations.check_in_guest(id, "301").await.unwrap();
    assert_eq!(checked_in.status(), ReservationStatus::CheckedIn);
    assert_eq!(checked_in.assigned_room(), Some("301"));
    assert_eq!(hotel.reserved(&room, &range).await, vec![1, 1]);

    // In-house guests cannot cancel
    let err = reservations.cancel_reservation(id, "changed mind").await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Domain(DomainError::InvalidTransition {
            from: "CHECKED_IN",
            to: "CANCELLED",
            ..
        })
    ));
    assert_eq!(hotel.reserved(&room, &range).await, vec![1, 1]);

    hotel.go_to(date(2026, 5, 5));
    let outcome = reservations.check_out_guest(id).await.unwrap();
    assert_eq!(outcome.reservation.status(), ReservationStatus::CheckedOut);
    assert_eq!(outcome.amount_due, idr(2_000_000));
    assert_eq!(hotel.reserved(&room, &range).await, vec![0, 0]);

    // Terminal
    let err = reservations.check_out_guest(id).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Domain(DomainError::InvalidTransition { from: "CHECKED_OUT", .. })
    ));
}

/// Test 4: No-Show
///
/// Only a confirmed reservation can be a no-show; doing so frees the rooms.
#[tokio::test]
async fn test_no_show_releases_rooms() {
    let hotel = Hotel::open(date(2026, 5, 1));
    let room = deluxe();
    hotel.open_inventory(&room, date(2026, 5, 2), date(2026, 5, 2), 2, 0).await;
    let range = stay(date(2026, 5, 2), date(2026, 5, 3));
    let reservations = &hotel.services.reservations;

    let id = reservations
        .create_reservation(booking(&room, range))
        .await
        .unwrap()
        .id();

    let err = reservations.mark_no_show(id).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Domain(DomainError::InvalidTransition {
            from: "PENDING",
            to: "NO_SHOW",
            ..
        })
    ));
    assert_eq!(hotel.reserved(&room, &range).await, vec![1]);

    reservations.confirm_reservation(id, true).await.unwrap();
    hotel.go_to(date(2026, 5, 3));
    let outcome = reservations.mark_no_show(id).await.unwrap();

    assert_eq!(outcome.reservation.status(), ReservationStatus::NoShow);
    assert_eq!(outcome.reservation.refund_amount(), None);
    assert_eq!(hotel.reserved(&room, &range).await, vec![0]);
}

/// Test 5: Lookups and Special Requests
#[tokio::test]
async fn test_lookup_and_special_requests() {
    let hotel = Hotel::open(date(2026, 7, 1));
    let room = deluxe();
    hotel.open_inventory(&room, date(2026, 7, 10), date(2026, 7, 10), 5, 0).await;
    let range = stay(date(2026, 7, 10), date(2026, 7, 11));
    let reservations = &hotel.services.reservations;

    let command = booking(&room, range).with_special_request(RequestType::LateCheckout, "Until 2pm");
    let guest_id = command.guest_id;
    let reservation = reservations.create_reservation(command).await.unwrap();
    assert_eq!(reservation.special_requests().len(), 1);

    let by_code = reservations
        .find_by_confirmation_code(reservation.confirmation_code().as_str())
        .await
        .unwrap();
    assert_eq!(by_code.id(), reservation.id());

    let err = reservations
        .find_by_confirmation_code("NOPE")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));

    let request_id = reservations
        .add_special_request(reservation.id(), RequestType::HighFloor, "Away from the lift")
        .await
        .unwrap();
    let updated = reservations
        .fulfill_special_request(reservation.id(), request_id, Some("Room 1204".to_string()))
        .await
        .unwrap();

    let fulfilled = updated
        .special_requests()
        .iter()
        .find(|request| request.id == request_id)
        .unwrap();
    assert!(fulfilled.fulfilled);
    assert_eq!(fulfilled.notes.as_deref(), Some("Room 1204"));

    let mine = reservations.find_by_guest(guest_id).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(reservations.list_reservations().await.unwrap().len(), 1);

    let err = reservations
        .get_reservation(hotel_reservations::types::ReservationId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { kind: "Reservation", .. }));
}

/// Test 6: Published Events
///
/// Booking publishes one inventory change per night followed by the
/// reservation event; cancelling publishes the releases and the cancellation.
#[tokio::test]
async fn test_events_follow_committed_state() {
    let hotel = Hotel::open(date(2026, 8, 1));
    let room = deluxe();
    hotel.open_inventory(&room, date(2026, 8, 20), date(2026, 8, 21), 4, 0).await;
    let range = stay(date(2026, 8, 20), date(2026, 8, 22));

    let reservation = hotel
        .services
        .reservations
        .create_reservation(booking(&room, range))
        .await
        .unwrap();
    assert_eq!(
        hotel.events.event_types(),
        vec![
            "AvailabilityChanged.v1",
            "AvailabilityChanged.v1",
            "ReservationCreated.v1",
        ]
    );

    hotel.events.clear();
    hotel
        .services
        .reservations
        .cancel_reservation(reservation.id(), "No longer travelling")
        .await
        .unwrap();

    assert_eq!(hotel.events.events_on_topic("availability-events").len(), 2);
    let cancelled = hotel.events.events_of_type("ReservationCancelled.v1");
    assert_eq!(cancelled.len(), 1);
    let event: HotelEvent = cancelled[0].decode().unwrap();
    assert!(matches!(
        event,
        HotelEvent::ReservationCancelled { reservation_id, ref refund, .. }
            if reservation_id == reservation.id() && *refund == idr(2_000_000)
    ));
}

/// Test 7: Rejected Bookings
///
/// Invalid requests fail before any inventory is touched.
#[tokio::test]
async fn test_invalid_bookings_touch_nothing() {
    let hotel = Hotel::open(date(2026, 9, 10));
    let room = deluxe();
    hotel.open_inventory(&room, date(2026, 9, 1), date(2026, 9, 30), 5, 0).await;
    let reservations = &hotel.services.reservations;

    // Check-in in the past
    let past = stay(date(2026, 9, 5), date(2026, 9, 7));
    let err = reservations
        .create_reservation(booking(&room, past))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));

    // No rooms
    let range = stay(date(2026, 9, 12), date(2026, 9, 13));
    let err = reservations
        .create_reservation(booking(&room, range).with_room_count(0))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));

    assert_eq!(hotel.reserved(&room, &past).await, vec![0, 0]);
    assert_eq!(hotel.reserved(&room, &range).await, vec![0]);
    assert!(reservations.list_reservations().await.unwrap().is_empty());
    assert!(hotel.events.is_empty());
}
