//! Aggregates of the hotel reservation domain.
//!
//! - Availability: room inventory per room type and night
//! - Reservation: a guest's booking and its lifecycle
//! - Waitlist: guests queued for sold-out stays
//!
//! Aggregates refer to each other only by identifier. Anything that spans more
//! than one of them lives in [`crate::app`].

pub mod availability;
pub mod reservation;
pub mod waitlist;

pub use availability::{Availability, InventoryAction};
pub use reservation::{InventoryHold, NewReservation, Reservation, ReservationChanges, StayRules};
pub use waitlist::{NewWaitlistEntry, WaitlistEntry, notification_order, sort_for_notification};
