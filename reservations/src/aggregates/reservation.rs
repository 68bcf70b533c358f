//! Reservation aggregate: a guest's booking and its lifecycle.
//!
//! ```text
//! PENDING ──confirm──▶ CONFIRMED ──check_in──▶ CHECKED_IN ──check_out──▶ CHECKED_OUT
//!    │                    │  │
//!    └──cancel──▶ CANCELLED ◀┘  └──mark_no_show──▶ NO_SHOW
//! ```
//!
//! The aggregate never touches inventory itself. It exposes the rooms it holds
//! as an [`InventoryHold`] and the coordination layer reserves or releases them
//! around each transition.

use crate::error::DomainError;
use crate::pricing::quote;
use crate::types::{
    AvailabilityKey, CancellationPolicy, ConfirmationCode, DateRange, GuestCount, GuestId, Money,
    RequestType, ReservationId, ReservationSource, ReservationStatus, RoomTypeId, SpecialRequest,
    SpecialRequestId,
};
use chrono::{DateTime, NaiveDate, Utc};
use hotel_core::{Aggregate, Version};
use serde::{Deserialize, Serialize};

const KIND: &str = "Reservation";

/// Limits applied when a stay is booked or changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StayRules {
    /// Longest bookable stay
    pub max_stay_nights: u32,
    /// Days that must remain before check-in for a reservation to be modified
    pub min_modification_lead_days: u32,
}

impl Default for StayRules {
    fn default() -> Self {
        Self {
            max_stay_nights: 30,
            min_modification_lead_days: 1,
        }
    }
}

impl StayRules {
    /// Check a stay against the length limit and against `now`'s date.
    ///
    /// # Errors
    ///
    /// [`DomainError::Validation`] when the stay is too long or starts in the past.
    pub fn validate(&self, range: &DateRange, now: DateTime<Utc>) -> Result<(), DomainError> {
        if range.nights() > self.max_stay_nights {
            return Err(DomainError::validation(format!(
                "stay of {} nights exceeds the maximum of {}",
                range.nights(),
                self.max_stay_nights
            )));
        }
        if range.check_in() < now.date_naive() {
            return Err(DomainError::validation(format!(
                "check-in date {} is in the past",
                range.check_in()
            )));
        }
        Ok(())
    }

    /// Whether a stay starting on `check_in` is still far enough away on
    /// `today` to be modified.
    #[must_use]
    pub fn allows_modification(&self, check_in: NaiveDate, today: NaiveDate) -> bool {
        (check_in - today).num_days() >= i64::from(self.min_modification_lead_days)
    }
}

/// The rooms a reservation holds: `room_count` rooms of one type on every night
/// of the stay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InventoryHold {
    /// Room type
    pub room_type_id: RoomTypeId,
    /// Nights held
    pub date_range: DateRange,
    /// Rooms per night
    pub room_count: u32,
}

impl InventoryHold {
    /// Room-date keys covered by the hold, ascending
    #[must_use]
    pub fn keys(&self) -> Vec<AvailabilityKey> {
        AvailabilityKey::for_range(&self.room_type_id, &self.date_range)
    }
}

/// Everything needed to open a reservation.
#[derive(Clone, Debug)]
pub struct NewReservation {
    /// Human-facing lookup code, unique across reservations
    pub confirmation_code: ConfirmationCode,
    /// Guest making the booking
    pub guest_id: GuestId,
    /// Booked room type
    pub room_type_id: RoomTypeId,
    /// Stay
    pub date_range: DateRange,
    /// Occupants
    pub guest_count: GuestCount,
    /// Rooms per night
    pub room_count: u32,
    /// Rate for one room for one night
    pub nightly_rate: Money,
    /// Booking channel
    pub source: ReservationSource,
    /// Requests made at booking time
    pub special_requests: Vec<(RequestType, String)>,
    /// Actor creating the reservation
    pub created_by: String,
}

/// Requested changes to a modifiable reservation. `None` keeps the current value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReservationChanges {
    /// New stay
    pub date_range: Option<DateRange>,
    /// New occupants
    pub guest_count: Option<GuestCount>,
    /// New room type
    pub room_type_id: Option<RoomTypeId>,
    /// New rooms per night
    pub room_count: Option<u32>,
}

impl ReservationChanges {
    /// Change only the dates
    #[must_use]
    pub fn dates(date_range: DateRange) -> Self {
        Self {
            date_range: Some(date_range),
            ..Self::default()
        }
    }

    /// Whether nothing would change
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.date_range.is_none()
            && self.guest_count.is_none()
            && self.room_type_id.is_none()
            && self.room_count.is_none()
    }

    /// Whether the rooms held would change
    #[must_use]
    pub const fn affects_inventory(&self) -> bool {
        self.date_range.is_some() || self.room_type_id.is_some() || self.room_count.is_some()
    }

    /// The hold that results from applying these changes to `current`
    #[must_use]
    pub fn apply_to(&self, current: &InventoryHold) -> InventoryHold {
        InventoryHold {
            room_type_id: self
                .room_type_id
                .clone()
                .unwrap_or_else(|| current.room_type_id.clone()),
            date_range: self.date_range.unwrap_or(current.date_range),
            room_count: self.room_count.unwrap_or(current.room_count),
        }
    }
}

/// A booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    id: ReservationId,
    confirmation_code: ConfirmationCode,
    guest_id: GuestId,
    room_type_id: RoomTypeId,
    date_range: DateRange,
    guest_count: GuestCount,
    room_count: u32,
    nightly_rate: Money,
    total_amount: Money,
    cancellation_policy: CancellationPolicy,
    status: ReservationStatus,
    source: ReservationSource,
    special_requests: Vec<SpecialRequest>,
    assigned_room: Option<String>,
    cancellation_reason: Option<String>,
    refund_amount: Option<Money>,
    cancelled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
    created_by: String,
    version: Version,
}

fn total_for(nightly_rate: &Money, range: &DateRange, room_count: u32) -> Result<Money, DomainError> {
    let total = quote(nightly_rate, range.nights(), room_count)?;
    if total.is_zero() {
        return Err(DomainError::validation("total amount must be positive"));
    }
    Ok(total)
}

fn check_room_count(room_count: u32) -> Result<(), DomainError> {
    if room_count == 0 {
        Err(DomainError::validation("room count must be at least 1"))
    } else {
        Ok(())
    }
}

impl Reservation {
    /// Open a PENDING reservation at version 1.
    ///
    /// # Errors
    ///
    /// [`DomainError::Validation`] when the stay is too long or starts in the
    /// past, no room is requested, or the computed total is zero.
    pub fn create(
        new: NewReservation,
        now: DateTime<Utc>,
        rules: &StayRules,
    ) -> Result<Self, DomainError> {
        rules.validate(&new.date_range, now)?;
        check_room_count(new.room_count)?;
        let total_amount = total_for(&new.nightly_rate, &new.date_range, new.room_count)?;

        let special_requests = new
            .special_requests
            .into_iter()
            .map(|(request_type, description)| SpecialRequest::new(request_type, description, now))
            .collect();

        Ok(Self {
            id: ReservationId::new(),
            confirmation_code: new.confirmation_code,
            guest_id: new.guest_id,
            room_type_id: new.room_type_id,
            date_range: new.date_range,
            guest_count: new.guest_count,
            room_count: new.room_count,
            nightly_rate: new.nightly_rate,
            total_amount,
            cancellation_policy: CancellationPolicy::default(),
            status: ReservationStatus::Pending,
            source: new.source,
            special_requests,
            assigned_room: None,
            cancellation_reason: None,
            refund_amount: None,
            cancelled_at: None,
            created_at: now,
            modified_at: now,
            created_by: new.created_by,
            version: Version::FIRST,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// System identifier
    #[must_use]
    pub const fn id(&self) -> ReservationId {
        self.id
    }

    /// Human lookup code
    #[must_use]
    pub const fn confirmation_code(&self) -> &ConfirmationCode {
        &self.confirmation_code
    }

    /// Guest
    #[must_use]
    pub const fn guest_id(&self) -> GuestId {
        self.guest_id
    }

    /// Room type
    #[must_use]
    pub const fn room_type_id(&self) -> &RoomTypeId {
        &self.room_type_id
    }

    /// Stay
    #[must_use]
    pub const fn date_range(&self) -> &DateRange {
        &self.date_range
    }

    /// Occupants
    #[must_use]
    pub const fn guest_count(&self) -> GuestCount {
        self.guest_count
    }

    /// Rooms held per night
    #[must_use]
    pub const fn room_count(&self) -> u32 {
        self.room_count
    }

    /// Rate for one room for one night
    #[must_use]
    pub const fn nightly_rate(&self) -> &Money {
        &self.nightly_rate
    }

    /// `nightly_rate × nights × room_count`
    #[must_use]
    pub const fn total_amount(&self) -> &Money {
        &self.total_amount
    }

    /// Refund rule
    #[must_use]
    pub const fn cancellation_policy(&self) -> CancellationPolicy {
        self.cancellation_policy
    }

    /// Lifecycle status
    #[must_use]
    pub const fn status(&self) -> ReservationStatus {
        self.status
    }

    /// Booking channel
    #[must_use]
    pub const fn source(&self) -> ReservationSource {
        self.source
    }

    /// Guest requests, in the order they were made
    #[must_use]
    pub fn special_requests(&self) -> &[SpecialRequest] {
        &self.special_requests
    }

    /// Room number assigned at check-in
    #[must_use]
    pub fn assigned_room(&self) -> Option<&str> {
        self.assigned_room.as_deref()
    }

    /// Reason given on cancellation
    #[must_use]
    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    /// Refund computed on cancellation
    #[must_use]
    pub const fn refund_amount(&self) -> Option<&Money> {
        self.refund_amount.as_ref()
    }

    /// When the reservation was cancelled
    #[must_use]
    pub const fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    /// Creation time
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time of the last mutation
    #[must_use]
    pub const fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }

    /// Actor who created the reservation
    #[must_use]
    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Number of nights
    #[must_use]
    pub fn nights(&self) -> u32 {
        self.date_range.nights()
    }

    /// Dates, room type or counts may still change: PENDING or CONFIRMED, with
    /// check-in at least the rules' lead time after `now`'s date.
    #[must_use]
    pub fn is_modifiable(&self, now: DateTime<Utc>, rules: &StayRules) -> bool {
        self.has_modifiable_status()
            && rules.allows_modification(self.date_range.check_in(), now.date_naive())
    }

    const fn has_modifiable_status(&self) -> bool {
        matches!(
            self.status,
            ReservationStatus::Pending | ReservationStatus::Confirmed
        )
    }

    /// Cancellation is still possible
    #[must_use]
    pub const fn is_cancellable(&self) -> bool {
        self.status.can_transition_to(ReservationStatus::Cancelled)
    }

    /// Rooms this reservation holds
    #[must_use]
    pub fn inventory_hold(&self) -> InventoryHold {
        InventoryHold {
            room_type_id: self.room_type_id.clone(),
            date_range: self.date_range,
            room_count: self.room_count,
        }
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Apply `changes` and recompute the total with `nightly_rate`, the rate of
    /// the resulting room type.
    ///
    /// # Errors
    ///
    /// - [`DomainError::InvalidTransition`] unless PENDING or CONFIRMED
    /// - [`DomainError::Validation`] for an empty change set, an invalid stay,
    ///   or a check-in closer than the rules' modification lead time
    pub fn modify(
        &mut self,
        changes: ReservationChanges,
        nightly_rate: Money,
        now: DateTime<Utc>,
        rules: &StayRules,
    ) -> Result<(), DomainError> {
        if !self.has_modifiable_status() {
            return Err(self.invalid("MODIFIED"));
        }
        if !rules.allows_modification(self.date_range.check_in(), now.date_naive()) {
            return Err(DomainError::validation(format!(
                "reservations starting on {} can no longer be modified",
                self.date_range.check_in()
            )));
        }
        if changes.is_empty() {
            return Err(DomainError::validation("no changes requested"));
        }

        let hold = changes.apply_to(&self.inventory_hold());
        if changes.date_range.is_some() {
            rules.validate(&hold.date_range, now)?;
        }
        check_room_count(hold.room_count)?;
        let total_amount = total_for(&nightly_rate, &hold.date_range, hold.room_count)?;

        self.room_type_id = hold.room_type_id;
        self.date_range = hold.date_range;
        self.room_count = hold.room_count;
        if let Some(guest_count) = changes.guest_count {
            self.guest_count = guest_count;
        }
        self.nightly_rate = nightly_rate;
        self.total_amount = total_amount;
        self.touch(now);
        Ok(())
    }

    /// Change only the stay dates.
    ///
    /// # Errors
    ///
    /// See [`Reservation::modify`].
    pub fn modify_dates(
        &mut self,
        date_range: DateRange,
        now: DateTime<Utc>,
        rules: &StayRules,
    ) -> Result<(), DomainError> {
        let rate = self.nightly_rate.clone();
        self.modify(ReservationChanges::dates(date_range), rate, now, rules)
    }

    /// Attach a new unfulfilled request.
    ///
    /// # Errors
    ///
    /// [`DomainError::InvalidTransition`] in a terminal status.
    pub fn add_special_request(
        &mut self,
        request_type: RequestType,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<SpecialRequestId, DomainError> {
        if self.status.is_terminal() {
            return Err(self.invalid("SPECIAL_REQUEST_ADDED"));
        }
        let request = SpecialRequest::new(request_type, description, now);
        let id = request.id;
        self.special_requests.push(request);
        self.touch(now);
        Ok(id)
    }

    /// Mark a request fulfilled.
    ///
    /// # Errors
    ///
    /// - [`DomainError::InvalidTransition`] in a terminal status
    /// - [`DomainError::Validation`] when no request has that id
    pub fn fulfill_special_request(
        &mut self,
        request_id: SpecialRequestId,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(self.invalid("SPECIAL_REQUEST_FULFILLED"));
        }
        let request = self
            .special_requests
            .iter_mut()
            .find(|request| request.id == request_id)
            .ok_or_else(|| DomainError::validation(format!("unknown special request {request_id}")))?;
        request.fulfill(notes);
        self.touch(now);
        Ok(())
    }

    /// PENDING → CONFIRMED once payment has cleared.
    ///
    /// # Errors
    ///
    /// - [`DomainError::InvalidTransition`] unless PENDING
    /// - [`DomainError::PaymentNotConfirmed`] when `payment_confirmed` is false
    pub fn confirm(&mut self, payment_confirmed: bool, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.ensure_transition(ReservationStatus::Confirmed)?;
        if !payment_confirmed {
            return Err(DomainError::PaymentNotConfirmed);
        }
        self.status = ReservationStatus::Confirmed;
        self.touch(now);
        Ok(())
    }

    /// CONFIRMED → CHECKED_IN, assigning a room.
    ///
    /// # Errors
    ///
    /// - [`DomainError::InvalidTransition`] unless CONFIRMED
    /// - [`DomainError::Validation`] before the check-in date or without a room number
    pub fn check_in(&mut self, room_number: impl Into<String>, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.ensure_transition(ReservationStatus::CheckedIn)?;
        let room_number = room_number.into();
        if room_number.trim().is_empty() {
            return Err(DomainError::validation("room number is required"));
        }
        if now.date_naive() < self.date_range.check_in() {
            return Err(DomainError::validation(format!(
                "cannot check in before {}",
                self.date_range.check_in()
            )));
        }
        self.status = ReservationStatus::CheckedIn;
        self.assigned_room = Some(room_number);
        self.touch(now);
        Ok(())
    }

    /// CHECKED_IN → CHECKED_OUT. Returns the amount due.
    ///
    /// # Errors
    ///
    /// [`DomainError::InvalidTransition`] unless CHECKED_IN.
    pub fn check_out(&mut self, now: DateTime<Utc>) -> Result<Money, DomainError> {
        self.ensure_transition(ReservationStatus::CheckedOut)?;
        self.status = ReservationStatus::CheckedOut;
        self.touch(now);
        Ok(self.total_amount.clone())
    }

    /// PENDING | CONFIRMED → CANCELLED. Returns the refund.
    ///
    /// The refund tier is chosen by whole days between `now`'s date and the
    /// check-in date.
    ///
    /// # Errors
    ///
    /// [`DomainError::InvalidTransition`] from any other status.
    pub fn cancel(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> Result<Money, DomainError> {
        self.ensure_transition(ReservationStatus::Cancelled)?;
        let days_before = (self.date_range.check_in() - now.date_naive()).num_days();
        let refund = self
            .cancellation_policy
            .refund_for(&self.total_amount, days_before);

        self.status = ReservationStatus::Cancelled;
        self.cancellation_reason = Some(reason.into());
        self.refund_amount = Some(refund.clone());
        self.cancelled_at = Some(now);
        self.touch(now);
        Ok(refund)
    }

    /// CONFIRMED → NO_SHOW. No refund.
    ///
    /// # Errors
    ///
    /// [`DomainError::InvalidTransition`] unless CONFIRMED.
    pub fn mark_no_show(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.ensure_transition(ReservationStatus::NoShow)?;
        self.status = ReservationStatus::NoShow;
        self.touch(now);
        Ok(())
    }

    fn ensure_transition(&self, target: ReservationStatus) -> Result<(), DomainError> {
        if self.status.can_transition_to(target) {
            Ok(())
        } else {
            Err(self.invalid(target.as_str()))
        }
    }

    const fn invalid(&self, to: &'static str) -> DomainError {
        DomainError::InvalidTransition {
            aggregate: KIND,
            from: self.status.as_str(),
            to,
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.modified_at = now;
        self.version = self.version.next();
    }
}

impl Aggregate for Reservation {
    type Id = ReservationId;
    const KIND: &'static str = KIND;

    fn id(&self) -> ReservationId {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }
}
