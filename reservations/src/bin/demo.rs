//! Hotel reservations demo
//!
//! Walks through one busy weekend on in-memory storage:
//! - room inventory set up for a few nights
//! - a booking that takes the last rooms
//! - a second guest put on the waitlist
//! - a cancellation releasing the rooms and notifying the waitlist
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=info,hotel_reservations=debug cargo run --bin hotel-demo
//! ```

use anyhow::Context;
use chrono::{Duration, NaiveDate};
use hotel_core::SystemClock;
use hotel_core::environment::Clock;
use hotel_reservations::app::{AddToWaitlist, CreateReservation, HotelServices, ServiceError};
use hotel_reservations::config::Config;
use hotel_reservations::pricing::RateTable;
use hotel_reservations::types::{
    DateRange, GuestCount, GuestId, Money, Priority, RequestType, RoomTypeId,
};
use hotel_runtime::TracingEventBus;
use hotel_runtime::metrics::MetricsServer;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut metrics = MetricsServer::new(
        config
            .observability
            .metrics_addr
            .parse()
            .context("invalid metrics address")?,
    );
    metrics.start()?;

    let deluxe = RoomTypeId::new("DELUXE");
    let suite = RoomTypeId::new("SUITE");
    let currency = config.reservation.currency.clone();
    let rates = RateTable::new()
        .with_default(config.reservation.default_rate())
        .with_rate(suite.clone(), Money::new(Decimal::from(2_500_000), currency)?);

    let clock = SystemClock;
    let services = HotelServices::in_memory(
        &config,
        Arc::new(clock),
        Arc::new(TracingEventBus::new()),
        Arc::new(rates),
    );

    println!("\n============================================");
    println!("   Hotel Reservations - Demo");
    println!("============================================\n");

    // Step 1: inventory for the next week
    let first_night = clock.today() + Duration::days(14);
    let stay = DateRange::new(first_night, first_night + Duration::days(3))?;
    for night in nights(first_night, 7) {
        services.availability.create_availability(&deluxe, night, 2, 0).await?;
        services.availability.create_availability(&suite, night, 1, 0).await?;
    }
    println!("1. Inventory: 2 DELUXE and 1 SUITE per night from {first_night}");

    // Step 2: a family takes both deluxe rooms
    let family = GuestId::new();
    let booking = services
        .reservations
        .create_reservation(
            CreateReservation::new(family, deluxe.clone(), stay, GuestCount::new(4, 2)?)
                .with_room_count(2)
                .with_special_request(RequestType::HighFloor, "Quiet rooms with a view"),
        )
        .await?;
    println!(
        "2. Booked {} ({} nights, {} rooms, total {})",
        booking.confirmation_code(),
        booking.nights(),
        booking.room_count(),
        booking.total_amount()
    );

    let booking = services
        .reservations
        .confirm_reservation(booking.id(), true)
        .await?;
    println!("   Payment received, status {}", booking.status());

    // Step 3: the next guest finds the hotel full
    let latecomer = GuestId::new();
    match services
        .reservations
        .create_reservation(CreateReservation::new(
            latecomer,
            deluxe.clone(),
            stay,
            GuestCount::new(2, 0)?,
        ))
        .await
    {
        Err(ServiceError::RoomsUnavailable { .. }) => {
            let entry = services
                .waitlist
                .add_to_waitlist(
                    AddToWaitlist::new(latecomer, deluxe.clone(), stay, GuestCount::new(2, 0)?)
                        .with_priority(Priority::High),
                )
                .await?;
            println!(
                "3. No DELUXE rooms left, guest waitlisted (score {})",
                entry.priority_score(clock.now())
            );
        }
        Err(err) => return Err(err.into()),
        Ok(reservation) => {
            println!("3. Unexpectedly booked {}", reservation.confirmation_code());
        }
    }

    // Step 4: the family cancels
    let outcome = services
        .reservations
        .cancel_reservation(booking.id(), "Change of plans")
        .await?;
    println!(
        "4. Cancelled {}, refund {}, {} waitlist entr{} notified",
        outcome.reservation.confirmation_code(),
        outcome.refund,
        outcome.notified_waitlist.len(),
        if outcome.notified_waitlist.len() == 1 { "y" } else { "ies" }
    );

    // Step 5: inventory is back
    for availability in services.availability.find_range(&deluxe, &stay).await? {
        println!(
            "   {} {}: {} of {} rooms free",
            availability.room_type_id(),
            availability.date(),
            availability.available_rooms(),
            availability.total_rooms()
        );
    }

    if let Some(rendered) = metrics.render() {
        let created = rendered
            .lines()
            .find(|line| line.starts_with("reservations_created_total"))
            .unwrap_or("reservations_created_total 0");
        println!("\nMetrics: {created}");
    }

    println!("\n============================================\n");
    Ok(())
}

fn nights(first: NaiveDate, count: i64) -> impl Iterator<Item = NaiveDate> {
    (0..count).map(move |offset| first + Duration::days(offset))
}
