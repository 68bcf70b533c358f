//! Configuration management for the hotel reservation services.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Binaries may prime the environment from a `.env` file with `dotenvy` first.

use crate::aggregates::StayRules;
use crate::types::{Currency, Money};
use hotel_runtime::RetryPolicy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Booking rules and pricing defaults
    pub reservation: ReservationPolicy,
    /// Waitlist timing
    pub waitlist: WaitlistPolicy,
    /// Retries for compensating inventory updates
    pub compensation: CompensationConfig,
    /// Logging and metrics
    pub observability: ObservabilityConfig,
}

/// Booking rules and pricing defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationPolicy {
    /// Currency of all amounts (default: IDR)
    pub currency: Currency,
    /// Nightly rate for room types without their own rate (default: 1000000)
    pub default_nightly_rate: Decimal,
    /// Longest bookable stay in nights (default: 30)
    pub max_stay_nights: u32,
    /// Days before check-in after which a reservation can no longer be
    /// modified (default: 1)
    pub modification_lead_days: u32,
}

/// Waitlist timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistPolicy {
    /// How long a new entry stays active, in hours (default: 48)
    pub expiry_hours: u32,
    /// Minimum days between two notices to the same guest (default: 3)
    pub reminder_days: u32,
}

/// Retries for compensating inventory updates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationConfig {
    /// Retries after the first attempt (default: 3)
    pub max_retries: usize,
    /// Delay before the first retry in milliseconds (default: 10)
    pub initial_delay_ms: u64,
}

/// Logging and metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level used when `RUST_LOG` is unset (default: info)
    pub log_level: String,
    /// Prometheus exporter bind address (default: 0.0.0.0:9090)
    pub metrics_addr: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Missing or unparsable values fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its
    /// value.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            reservation: ReservationPolicy {
                currency: lookup("HOTEL_CURRENCY")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_default(),
                default_nightly_rate: lookup("HOTEL_DEFAULT_NIGHTLY_RATE")
                    .and_then(|s| s.parse::<Decimal>().ok())
                    .filter(|rate| !rate.is_sign_negative())
                    .unwrap_or_else(|| Decimal::new(1_000_000, 0)),
                max_stay_nights: lookup("HOTEL_MAX_STAY_NIGHTS")
                    .and_then(|s| s.parse().ok())
                    .filter(|nights| *nights > 0)
                    .unwrap_or(30),
                modification_lead_days: lookup("HOTEL_MODIFICATION_LEAD_DAYS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1),
            },
            waitlist: WaitlistPolicy {
                expiry_hours: lookup("HOTEL_WAITLIST_EXPIRY_HOURS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(48),
                reminder_days: lookup("HOTEL_WAITLIST_REMINDER_DAYS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3),
            },
            compensation: CompensationConfig {
                max_retries: lookup("HOTEL_COMPENSATION_MAX_RETRIES")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3),
                initial_delay_ms: lookup("HOTEL_COMPENSATION_INITIAL_DELAY_MS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            },
            observability: ObservabilityConfig {
                log_level: lookup("HOTEL_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
                metrics_addr: lookup("HOTEL_METRICS_ADDR")
                    .unwrap_or_else(|| "0.0.0.0:9090".to_string()),
            },
        }
    }

    /// Stay limits for reservations
    #[must_use]
    pub const fn stay_rules(&self) -> StayRules {
        StayRules {
            max_stay_nights: self.reservation.max_stay_nights,
            min_modification_lead_days: self.reservation.modification_lead_days,
        }
    }

    /// Retry policy for compensating actions
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(self.compensation.max_retries)
            .initial_delay(Duration::from_millis(self.compensation.initial_delay_ms))
            .build()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl ReservationPolicy {
    /// The default nightly rate in the configured currency
    #[must_use]
    pub fn default_rate(&self) -> Money {
        Money::new(self.default_nightly_rate, self.currency.clone())
            .unwrap_or_else(|_| Money::zero(self.currency.clone()))
    }
}

impl WaitlistPolicy {
    /// Lifetime of a new entry
    #[must_use]
    pub fn expiry(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.expiry_hours))
    }

    /// Minimum gap between notices
    #[must_use]
    pub fn reminder_interval(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.reminder_days))
    }
}

impl Default for WaitlistPolicy {
    fn default() -> Self {
        Config::default().waitlist
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.reservation.currency.as_str(), "IDR");
        assert_eq!(config.reservation.default_nightly_rate, Decimal::new(1_000_000, 0));
        assert_eq!(config.stay_rules(), StayRules::default());
        assert_eq!(config.waitlist.expiry(), chrono::Duration::hours(48));
        assert_eq!(config.waitlist.reminder_interval(), chrono::Duration::days(3));
        assert_eq!(config.retry_policy().max_retries, 3);
        assert_eq!(config.observability.metrics_addr, "0.0.0.0:9090");
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("HOTEL_CURRENCY", "USD"),
            ("HOTEL_DEFAULT_NIGHTLY_RATE", "120.50"),
            ("HOTEL_MAX_STAY_NIGHTS", "14"),
            ("HOTEL_MODIFICATION_LEAD_DAYS", "3"),
            ("HOTEL_WAITLIST_EXPIRY_HOURS", "24"),
            ("HOTEL_COMPENSATION_MAX_RETRIES", "5"),
            ("HOTEL_LOG_LEVEL", "debug"),
        ]));
        assert_eq!(config.reservation.default_rate().to_string(), "120.50 USD");
        assert_eq!(config.stay_rules().max_stay_nights, 14);
        assert_eq!(config.stay_rules().min_modification_lead_days, 3);
        assert_eq!(config.waitlist.expiry(), chrono::Duration::hours(24));
        assert_eq!(config.retry_policy().max_retries, 5);
        assert_eq!(config.observability.log_level, "debug");
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = Config::from_lookup(lookup_from(&[
            ("HOTEL_CURRENCY", "dollars"),
            ("HOTEL_DEFAULT_NIGHTLY_RATE", "-5"),
            ("HOTEL_MAX_STAY_NIGHTS", "0"),
            ("HOTEL_WAITLIST_REMINDER_DAYS", "soon"),
        ]));
        assert_eq!(config, Config::default());
    }
}
