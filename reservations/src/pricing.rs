//! Nightly rate lookup.
//!
//! The reservation service asks a [`RateProvider`] for the rate of one room for
//! one night and multiplies it out with [`quote`]. [`RateTable`] is the
//! in-process provider, seeded per room type with an optional fallback rate
//! taken from configuration.

use crate::error::MoneyError;
use crate::types::{Money, RoomTypeId};
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// Errors from rate lookup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// No rate is configured for the room type and there is no default
    #[error("No rate configured for room type {0}")]
    UnknownRoomType(RoomTypeId),

    /// The rate source could not be reached
    #[error("Rate source unavailable: {0}")]
    Unavailable(String),
}

/// Source of nightly room rates.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Rate for one room of `room_type_id` for one night.
    ///
    /// # Errors
    ///
    /// See [`PricingError`].
    async fn nightly_rate(&self, room_type_id: &RoomTypeId) -> Result<Money, PricingError>;
}

/// Fixed per-room-type rates.
///
/// # Example
///
/// ```
/// use hotel_reservations::pricing::{RateProvider, RateTable};
/// use hotel_reservations::types::{Currency, Money, RoomTypeId};
/// use rust_decimal::Decimal;
///
/// # tokio_test::block_on(async {
/// let suite = Money::new(Decimal::new(2_500_000, 0), Currency::idr()).unwrap();
/// let table = RateTable::new().with_rate(RoomTypeId::new("SUITE_001"), suite.clone());
/// assert_eq!(table.nightly_rate(&RoomTypeId::new("SUITE_001")).await.unwrap(), suite);
/// assert!(table.nightly_rate(&RoomTypeId::new("DELUXE_001")).await.is_err());
/// # });
/// ```
#[derive(Clone, Debug, Default)]
pub struct RateTable {
    rates: HashMap<RoomTypeId, Money>,
    default_rate: Option<Money>,
}

impl RateTable {
    /// An empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rate for a room type
    #[must_use]
    pub fn with_rate(mut self, room_type_id: RoomTypeId, rate: Money) -> Self {
        self.rates.insert(room_type_id, rate);
        self
    }

    /// Rate used for room types without their own entry
    #[must_use]
    pub fn with_default(mut self, rate: Money) -> Self {
        self.default_rate = Some(rate);
        self
    }
}

#[async_trait]
impl RateProvider for RateTable {
    async fn nightly_rate(&self, room_type_id: &RoomTypeId) -> Result<Money, PricingError> {
        self.rates
            .get(room_type_id)
            .or(self.default_rate.as_ref())
            .cloned()
            .ok_or_else(|| PricingError::UnknownRoomType(room_type_id.clone()))
    }
}

/// `nightly_rate × nights × rooms`
///
/// # Errors
///
/// [`MoneyError::Overflow`] when the total does not fit.
pub fn quote(nightly_rate: &Money, nights: u32, rooms: u32) -> Result<Money, MoneyError> {
    let room_nights = nights.checked_mul(rooms).ok_or(MoneyError::Overflow)?;
    nightly_rate.times(room_nights)
}
