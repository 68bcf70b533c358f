//! Hotel Reservations - room inventory, bookings and a waitlist kept consistent
//! across aggregates.
//!
//! Three aggregates hold the state:
//!
//! - [`Availability`]: per room type and night, how many rooms exist, are booked
//!   and are blocked, with an optional overbooking allowance
//! - [`Reservation`]: a guest's stay with its lifecycle, price and refund rules
//! - [`WaitlistEntry`]: a guest waiting for rooms that are not available yet
//!
//! Aggregates never reach into each other. The services in [`app`] coordinate
//! them so that every non-terminal reservation holds exactly its rooms on every
//! night of its stay:
//!
//! ```text
//! create_reservation
//!   ├─ lock Availability(room, night) for every night (ascending)
//!   ├─ reserve rooms on every night      ── all or nothing
//!   ├─ store the Reservation             ── on failure: release the rooms again
//!   └─ publish ReservationCreated
//!
//! cancel_reservation
//!   ├─ lock Reservation, validate the transition
//!   ├─ release rooms on every night
//!   ├─ store the Reservation             ── on failure: reserve the rooms again
//!   └─ notify matching waitlist entries
//! ```
//!
//! Every aggregate carries a [`Version`](hotel_core::Version); repositories
//! reject a save whose version does not follow the stored one.
//!
//! # Example
//!
//! ```no_run
//! use hotel_reservations::app::{CreateReservation, HotelServices};
//! use hotel_reservations::config::Config;
//! use hotel_reservations::pricing::RateTable;
//! use hotel_reservations::types::{DateRange, GuestCount, GuestId, RoomTypeId};
//! use hotel_core::SystemClock;
//! use hotel_runtime::TracingEventBus;
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::from_env();
//! let rates = RateTable::new().with_default(config.reservation.default_rate());
//! let services = HotelServices::in_memory(
//!     &config,
//!     Arc::new(SystemClock),
//!     Arc::new(TracingEventBus::new()),
//!     Arc::new(rates),
//! );
//!
//! let room = RoomTypeId::new("DELUXE");
//! let stay = DateRange::new(
//!     chrono::NaiveDate::from_ymd_opt(2030, 6, 1).unwrap_or_default(),
//!     chrono::NaiveDate::from_ymd_opt(2030, 6, 4).unwrap_or_default(),
//! )?;
//! for night in stay.dates() {
//!     services.availability.create_availability(&room, night, 10, 0).await?;
//! }
//!
//! let reservation = services
//!     .reservations
//!     .create_reservation(CreateReservation::new(
//!         GuestId::new(),
//!         room,
//!         stay,
//!         GuestCount::new(2, 0)?,
//!     ))
//!     .await?;
//! println!("booked {}", reservation.confirmation_code());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aggregates;
pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod pricing;
pub mod repository;
pub mod types;

pub use aggregates::{Availability, InventoryAction, Reservation, WaitlistEntry};
pub use app::{HotelServices, ServiceError};
pub use config::Config;
pub use error::DomainError;
pub use events::HotelEvent;
