//! Domain types for the hotel reservation system.
//!
//! Identifiers, value objects and the enumerations that cross the system
//! boundary. Everything here is immutable and free of I/O; validation happens
//! at construction so an invalid value cannot be represented.

use crate::error::{DomainError, MoneyError};
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_identifier!(
    /// Unique identifier for a reservation
    ReservationId
);

uuid_identifier!(
    /// Unique identifier for a guest (owned by the guest profile context)
    GuestId
);

uuid_identifier!(
    /// Unique identifier for a waitlist entry
    WaitlistId
);

uuid_identifier!(
    /// Unique identifier for a special request within a reservation
    SpecialRequestId
);

/// Identifier of a room type, e.g. `DELUXE_001`
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomTypeId(String);

impl RoomTypeId {
    /// Create a room type identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomTypeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// The (room type, date) pair identifying one Availability record.
///
/// Ordering is by room type, then date, which is also the order in which
/// availability locks are acquired.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AvailabilityKey {
    /// Room type
    pub room_type_id: RoomTypeId,
    /// Calendar night
    pub date: NaiveDate,
}

impl AvailabilityKey {
    /// Create a room-date key
    #[must_use]
    pub const fn new(room_type_id: RoomTypeId, date: NaiveDate) -> Self {
        Self { room_type_id, date }
    }

    /// Keys for every night of `range`
    #[must_use]
    pub fn for_range(room_type_id: &RoomTypeId, range: &DateRange) -> Vec<Self> {
        range
            .dates()
            .map(|date| Self::new(room_type_id.clone(), date))
            .collect()
    }
}

impl fmt::Display for AvailabilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.room_type_id, self.date)
    }
}

/// Eight-character human-shareable reservation code (`A–Z`, `0–9`)
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConfirmationCode(String);

impl ConfirmationCode {
    /// Code length
    pub const LENGTH: usize = 8;

    const ALPHABET: &'static [u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    /// Generate a random code
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let code = (0..Self::LENGTH)
            .map(|_| char::from(Self::ALPHABET[rng.gen_range(0..Self::ALPHABET.len())]))
            .collect();
        Self(code)
    }

    /// Parse a code supplied by a guest
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] unless the code is exactly eight
    /// characters from `A–Z0–9`.
    pub fn parse(code: &str) -> Result<Self, DomainError> {
        if code.len() == Self::LENGTH && code.bytes().all(|b| Self::ALPHABET.contains(&b)) {
            Ok(Self(code.to_string()))
        } else {
            Err(DomainError::Validation(format!(
                "confirmation code must be {} characters A-Z or 0-9, got '{code}'",
                Self::LENGTH
            )))
        }
    }

    /// The code as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ConfirmationCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ConfirmationCode> for String {
    fn from(code: ConfirmationCode) -> Self {
        code.0
    }
}

impl fmt::Display for ConfirmationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Money
// ============================================================================

/// ISO-4217 style currency code: three ASCII uppercase letters
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Default currency code
    pub const DEFAULT_CODE: &'static str = "IDR";

    /// Parse a currency code
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::InvalidCurrency`] unless `code` is three ASCII
    /// uppercase letters.
    pub fn new(code: &str) -> Result<Self, MoneyError> {
        if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
            Ok(Self(code.to_string()))
        } else {
            Err(MoneyError::InvalidCurrency(code.to_string()))
        }
    }

    /// Indonesian rupiah
    #[must_use]
    pub fn idr() -> Self {
        Self(Self::DEFAULT_CODE.to_string())
    }

    /// The code as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::idr()
    }
}

impl FromStr for Currency {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = MoneyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A non-negative monetary amount in a single currency.
///
/// Serialised as `{"amount": "1000000", "currency": "IDR"}` with the amount as
/// a decimal string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawMoney")]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

#[derive(Deserialize)]
struct RawMoney {
    amount: Decimal,
    currency: Currency,
}

impl TryFrom<RawMoney> for Money {
    type Error = MoneyError;

    fn try_from(raw: RawMoney) -> Result<Self, Self::Error> {
        Self::new(raw.amount, raw.currency)
    }
}

impl Money {
    /// Create an amount
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Negative`] if `amount` is below zero.
    pub fn new(amount: Decimal, currency: Currency) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative(amount));
        }
        Ok(Self { amount, currency })
    }

    /// Zero in `currency`
    #[must_use]
    pub const fn zero(currency: Currency) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// The amount
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// The currency
    #[must_use]
    pub const fn currency(&self) -> &Currency {
        &self.currency
    }

    /// Whether the amount is zero
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    fn ensure_same_currency(&self, other: &Self) -> Result<(), MoneyError> {
        if self.currency == other.currency {
            Ok(())
        } else {
            Err(MoneyError::CurrencyMismatch {
                left: self.currency.clone(),
                right: other.currency.clone(),
            })
        }
    }

    /// Sum of two amounts in the same currency
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::CurrencyMismatch`] for different currencies and
    /// [`MoneyError::Overflow`] when the sum does not fit.
    pub fn checked_add(&self, other: &Self) -> Result<Self, MoneyError> {
        self.ensure_same_currency(other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or(MoneyError::Overflow)?;
        Self::new(amount, self.currency.clone())
    }

    /// Difference of two amounts in the same currency
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::CurrencyMismatch`] for different currencies and
    /// [`MoneyError::Negative`] if the result would be below zero.
    pub fn checked_sub(&self, other: &Self) -> Result<Self, MoneyError> {
        self.ensure_same_currency(other)?;
        let amount = self
            .amount
            .checked_sub(other.amount)
            .ok_or(MoneyError::Overflow)?;
        Self::new(amount, self.currency.clone())
    }

    /// Multiply by a non-negative factor
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Negative`] for a negative factor and
    /// [`MoneyError::Overflow`] when the product does not fit.
    pub fn scale(&self, factor: Decimal) -> Result<Self, MoneyError> {
        if factor.is_sign_negative() && !factor.is_zero() {
            return Err(MoneyError::Negative(factor));
        }
        let amount = self.amount.checked_mul(factor).ok_or(MoneyError::Overflow)?;
        Self::new(amount, self.currency.clone())
    }

    /// Multiply by a whole quantity (nights, rooms)
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] when the product does not fit.
    pub fn times(&self, quantity: u32) -> Result<Self, MoneyError> {
        let amount = self
            .amount
            .checked_mul(Decimal::from(quantity))
            .ok_or(MoneyError::Overflow)?;
        Ok(Self {
            amount,
            currency: self.currency.clone(),
        })
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

// ============================================================================
// Stay
// ============================================================================

/// A stay from `check_in` (inclusive) to `check_out` (exclusive).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

#[derive(Deserialize)]
struct RawDateRange {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = DomainError;

    fn try_from(raw: RawDateRange) -> Result<Self, Self::Error> {
        Self::new(raw.check_in, raw.check_out)
    }
}

impl DateRange {
    /// Create a stay
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] unless `check_out` is after `check_in`.
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, DomainError> {
        if check_out <= check_in {
            return Err(DomainError::Validation(format!(
                "check-out {check_out} must be after check-in {check_in}"
            )));
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    /// First night
    #[must_use]
    pub const fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    /// Departure date (not a night of the stay)
    #[must_use]
    pub const fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    /// Number of nights, at least 1
    #[must_use]
    pub fn nights(&self) -> u32 {
        u32::try_from((self.check_out - self.check_in).num_days()).unwrap_or(u32::MAX)
    }

    /// Every night of the stay, in order
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let check_out = self.check_out;
        self.check_in.iter_days().take_while(move |date| *date < check_out)
    }

    /// Whether the two stays share at least one night
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }

    /// Whether `date` is a night of the stay
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.check_in <= date && date < self.check_out
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.check_in, self.check_out)
    }
}

/// Number of guests on a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawGuestCount")]
pub struct GuestCount {
    adults: u8,
    children: u8,
}

#[derive(Deserialize)]
struct RawGuestCount {
    adults: u8,
    children: u8,
}

impl TryFrom<RawGuestCount> for GuestCount {
    type Error = DomainError;

    fn try_from(raw: RawGuestCount) -> Result<Self, Self::Error> {
        Self::new(raw.adults, raw.children)
    }
}

impl GuestCount {
    /// Maximum adults per booking
    pub const MAX_ADULTS: u8 = 10;
    /// Maximum children per booking
    pub const MAX_CHILDREN: u8 = 10;

    /// Create a guest count
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] unless `1 <= adults <= 10` and
    /// `children <= 10`.
    pub fn new(adults: u8, children: u8) -> Result<Self, DomainError> {
        if adults == 0 {
            return Err(DomainError::Validation("at least 1 adult required".to_string()));
        }
        if adults > Self::MAX_ADULTS {
            return Err(DomainError::Validation(format!(
                "at most {} adults allowed, got {adults}",
                Self::MAX_ADULTS
            )));
        }
        if children > Self::MAX_CHILDREN {
            return Err(DomainError::Validation(format!(
                "at most {} children allowed, got {children}",
                Self::MAX_CHILDREN
            )));
        }
        Ok(Self { adults, children })
    }

    /// Adults
    #[must_use]
    pub const fn adults(&self) -> u8 {
        self.adults
    }

    /// Children
    #[must_use]
    pub const fn children(&self) -> u8 {
        self.children
    }

    /// Adults plus children
    #[must_use]
    pub const fn total(&self) -> u16 {
        self.adults as u16 + self.children as u16
    }
}

// ============================================================================
// Enumerations
// ============================================================================

/// Declares a boundary enum whose variants cross the wire as fixed strings.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Wire representation
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    other => Err(DomainError::Validation(format!(
                        "unknown {} '{other}'",
                        stringify!($name)
                    ))),
                }
            }
        }
    };
}

wire_enum!(
    /// Reservation lifecycle status
    ReservationStatus {
        /// Created, awaiting payment confirmation
        Pending => "PENDING",
        /// Paid and guaranteed
        Confirmed => "CONFIRMED",
        /// Guest is in the hotel
        CheckedIn => "CHECKED_IN",
        /// Stay completed
        CheckedOut => "CHECKED_OUT",
        /// Cancelled before arrival
        Cancelled => "CANCELLED",
        /// Guest never arrived
        NoShow => "NO_SHOW",
    }
);

impl ReservationStatus {
    /// Whether no further transition is possible
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::CheckedOut | Self::Cancelled | Self::NoShow)
    }

    /// Whether the lifecycle has an edge from `self` to `target`
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Confirmed | Self::Cancelled)
                | (Self::Confirmed, Self::CheckedIn | Self::Cancelled | Self::NoShow)
                | (Self::CheckedIn, Self::CheckedOut)
        )
    }

    /// Whether a reservation in this status holds room inventory
    #[must_use]
    pub const fn holds_inventory(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed | Self::CheckedIn)
    }
}

wire_enum!(
    /// Channel a reservation was booked through
    ReservationSource {
        /// Website or app
        Online => "ONLINE",
        /// Call centre
        Phone => "PHONE",
        /// Front desk
        WalkIn => "WALK_IN",
        /// Travel agent or OTA
        Partner => "PARTNER",
    }
);

impl Default for ReservationSource {
    fn default() -> Self {
        Self::Online
    }
}

wire_enum!(
    /// Kind of special request a guest can make
    RequestType {
        /// Arrive before standard check-in time
        EarlyCheckin => "EARLY_CHECKIN",
        /// Leave after standard check-out time
        LateCheckout => "LATE_CHECKOUT",
        /// Room on a high floor
        HighFloor => "HIGH_FLOOR",
        /// Room on a low floor
        LowFloor => "LOW_FLOOR",
        /// Smoking room
        Smoking => "SMOKING",
        /// Non-smoking room
        NonSmoking => "NON_SMOKING",
        /// Extra amenities
        SpecialAmenities => "SPECIAL_AMENITIES",
        /// Anything else
        Other => "OTHER",
    }
);

wire_enum!(
    /// Waitlist entry lifecycle status
    WaitlistStatus {
        /// Waiting for a room
        Active => "ACTIVE",
        /// Turned into a reservation
        Converted => "CONVERTED",
        /// Expiry passed before a room was found
        Expired => "EXPIRED",
        /// Withdrawn by the guest
        Cancelled => "CANCELLED",
    }
);

impl WaitlistStatus {
    /// Whether no further transition is possible
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

/// Waitlist priority, serialised as its numeric value 1–4.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    /// 1
    Low = 1,
    /// 2
    Medium = 2,
    /// 3
    High = 3,
    /// 4
    Urgent = 4,
}

impl Priority {
    /// Numeric value 1–4
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Parse a numeric priority
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] outside 1–4.
    pub fn from_value(value: u8) -> Result<Self, DomainError> {
        match value {
            1 => Ok(Self::Low),
            2 => Ok(Self::Medium),
            3 => Ok(Self::High),
            4 => Ok(Self::Urgent),
            other => Err(DomainError::Validation(format!(
                "priority must be between 1 and 4, got {other}"
            ))),
        }
    }

    /// Name used in logs (`LOW`, `MEDIUM`, `HIGH`, `URGENT`)
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Urgent => "URGENT",
        }
    }
}

impl TryFrom<u8> for Priority {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        priority.value()
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.value())
    }
}

// ============================================================================
// Special requests and cancellation
// ============================================================================

/// A guest request attached to one reservation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialRequest {
    /// Identity within the reservation
    pub id: SpecialRequestId,
    /// What is requested
    pub request_type: RequestType,
    /// Free-text details
    pub description: String,
    /// Whether the hotel has fulfilled it
    pub fulfilled: bool,
    /// Staff notes recorded on fulfilment
    pub notes: Option<String>,
    /// When it was made
    pub created_at: DateTime<Utc>,
}

impl SpecialRequest {
    /// Create an unfulfilled request
    #[must_use]
    pub fn new(request_type: RequestType, description: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: SpecialRequestId::new(),
            request_type,
            description: description.into(),
            fulfilled: false,
            notes: None,
            created_at: now,
        }
    }

    /// Mark the request fulfilled
    pub fn fulfill(&mut self, notes: Option<String>) {
        self.fulfilled = true;
        self.notes = notes;
    }
}

/// Refund rule applied when a reservation is cancelled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancellationPolicy {
    /// 7+ days before check-in: 100%; 2–6 days: 50%; otherwise nothing
    #[default]
    Standard,
}

impl CancellationPolicy {
    /// Fraction of the total refunded when cancelling `days_before_check_in`
    /// days ahead (negative when cancelling after check-in day).
    #[must_use]
    pub fn refund_fraction(self, days_before_check_in: i64) -> Decimal {
        match self {
            Self::Standard => match days_before_check_in {
                d if d >= 7 => Decimal::ONE,
                d if d >= 2 => Decimal::new(5, 1),
                _ => Decimal::ZERO,
            },
        }
    }

    /// Refund owed on `total`, never negative
    #[must_use]
    pub fn refund_for(self, total: &Money, days_before_check_in: i64) -> Money {
        let fraction = self.refund_fraction(days_before_check_in);
        Money {
            amount: (total.amount * fraction).max(Decimal::ZERO).normalize(),
            currency: total.currency.clone(),
        }
    }
}
