//! Shared fixtures for the integration tests.

#![allow(dead_code)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::{NaiveDate, NaiveTime};
use hotel_core::event_bus::EventPublisher;
use hotel_reservations::app::{CreateReservation, HotelServices, Repositories};
use hotel_reservations::config::Config;
use hotel_reservations::pricing::RateTable;
use hotel_reservations::types::{Currency, DateRange, GuestCount, GuestId, Money, RoomTypeId};
use hotel_testing::{InMemoryEventBus, ManualClock, init_test_tracing};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Services over in-memory storage, a clock the test controls and a bus that
/// records every event.
pub struct Hotel {
    pub services: HotelServices,
    pub clock: ManualClock,
    pub events: Arc<InMemoryEventBus>,
}

impl Hotel {
    /// Hotel whose clock reads midnight UTC of `today`, charging 1,000,000 IDR
    /// per night for every room type.
    pub fn open(today: NaiveDate) -> Self {
        Self::with(Repositories::in_memory(), today, standard_rates())
    }

    pub fn with(repositories: Repositories, today: NaiveDate, rates: RateTable) -> Self {
        init_test_tracing();
        let clock = ManualClock::new(midnight(today));
        let events = Arc::new(InMemoryEventBus::new());
        let services = HotelServices::new(
            repositories,
            &test_config(),
            Arc::new(clock.clone()),
            events.clone(),
            Arc::new(rates),
        );
        Self {
            services,
            clock,
            events,
        }
    }

    pub fn with_publisher(today: NaiveDate, publisher: Arc<dyn EventPublisher>) -> Self {
        init_test_tracing();
        let clock = ManualClock::new(midnight(today));
        let services = HotelServices::new(
            Repositories::in_memory(),
            &test_config(),
            Arc::new(clock.clone()),
            publisher,
            Arc::new(standard_rates()),
        );
        Self {
            services,
            clock,
            events: Arc::new(InMemoryEventBus::new()),
        }
    }

    /// Set up `total` rooms of `room` for every night from `first` to `last`
    /// inclusive.
    pub async fn open_inventory(
        &self,
        room: &RoomTypeId,
        first: NaiveDate,
        last: NaiveDate,
        total: u32,
        overbooking: u32,
    ) {
        for night in first.iter_days().take_while(|night| *night <= last) {
            self.services
                .availability
                .create_availability(room, night, total, overbooking)
                .await
                .unwrap();
        }
    }

    /// Reserved rooms per night of `range`, in date order.
    pub async fn reserved(&self, room: &RoomTypeId, range: &DateRange) -> Vec<u32> {
        self.services
            .availability
            .find_range(room, range)
            .await
            .unwrap()
            .iter()
            .map(hotel_reservations::Availability::reserved_rooms)
            .collect()
    }

    pub fn go_to(&self, today: NaiveDate) {
        self.clock.set(midnight(today));
    }
}

/// Default configuration with a near-instant compensation backoff.
pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "HOTEL_COMPENSATION_INITIAL_DELAY_MS" => Some("1".to_string()),
        _ => None,
    })
}

pub fn standard_rates() -> RateTable {
    RateTable::new().with_default(idr(1_000_000))
}

pub fn deluxe() -> RoomTypeId {
    RoomTypeId::new("DELUXE_001")
}

pub fn suite() -> RoomTypeId {
    RoomTypeId::new("SUITE_001")
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn midnight(day: NaiveDate) -> chrono::DateTime<chrono::Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

pub fn stay(check_in: NaiveDate, check_out: NaiveDate) -> DateRange {
    DateRange::new(check_in, check_out).unwrap()
}

pub fn idr(amount: i64) -> Money {
    Money::new(Decimal::from(amount), Currency::idr()).unwrap()
}

pub fn couple() -> GuestCount {
    GuestCount::new(2, 0).unwrap()
}

pub fn booking(room: &RoomTypeId, range: DateRange) -> CreateReservation {
    CreateReservation::new(GuestId::new(), room.clone(), range, couple())
}
