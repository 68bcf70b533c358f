//! Prometheus metrics for observability and monitoring.
//!
//! Metric recorders are thin wrappers over the `metrics` facade, grouped by the
//! part of the system they describe:
//! - Reservation lifecycle (created, cancelled, rejected)
//! - Room inventory (rooms reserved and released, capacity rejections)
//! - Waitlist (entries added, notifications sent)
//! - Compensating actions and their retries
//! - Event publishing
//!
//! Recording is a no-op until a recorder is installed, so services can record
//! unconditionally.
//!
//! # Example
//!
//! ```rust,no_run
//! use hotel_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//! // Metrics available at http://0.0.0.0:9090/metrics
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to bind the scrape endpoint
    #[error("Failed to bind metrics server: {0}")]
    Bind(String),
}

/// Prometheus metrics server.
///
/// Exposes metrics on `http://{addr}/metrics` for Prometheus scraping.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server for `addr`.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Register metric descriptions, install the Prometheus recorder and
    /// serve the scrape endpoint on `addr`.
    ///
    /// Must be called from within a Tokio runtime: the HTTP listener and the
    /// exporter's upkeep task are spawned onto it.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Bind`] if `addr` cannot be bound and
    /// [`MetricsError::Build`] if the exporter cannot be configured.
    /// An already installed recorder is tolerated and only logged; in that
    /// case nothing is served from this instance.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let (recorder, exporter) = PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?
            .build()
            .map_err(|e| match e {
                BuildError::FailedToCreateHTTPListener(reason) => MetricsError::Bind(reason),
                other => MetricsError::Build(other.to_string()),
            })?;

        let handle = recorder.handle();
        if metrics::set_global_recorder(recorder).is_err() {
            tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
            return Ok(());
        }

        let addr = self.addr;
        tokio::spawn(async move {
            if exporter.await.is_err() {
                tracing::error!(%addr, "Metrics endpoint stopped serving");
            }
        });

        self.handle = Some(handle);
        tracing::info!(
            addr = %self.addr,
            "Metrics server started - available at http://{}/metrics",
            self.addr
        );
        Ok(())
    }

    /// Address the scrape endpoint listens on.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this instance did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

fn register_metrics() {
    describe_counter!("reservations_created_total", "Reservations created");
    describe_counter!("reservations_cancelled_total", "Reservations cancelled");
    describe_counter!(
        "reservations_rejected_total",
        "Reservation requests rejected, labelled by reason"
    );
    describe_histogram!(
        "service_operation_duration_seconds",
        "Time taken by a service operation, labelled by operation"
    );

    describe_counter!("inventory_rooms_reserved_total", "Room-nights reserved");
    describe_counter!("inventory_rooms_released_total", "Room-nights released");
    describe_counter!(
        "inventory_capacity_rejections_total",
        "Reserve attempts rejected for insufficient capacity"
    );

    describe_counter!("waitlist_entries_added_total", "Waitlist entries created");
    describe_counter!(
        "waitlist_notifications_total",
        "Waitlist entries notified of freed rooms"
    );

    describe_counter!(
        "compensations_total",
        "Compensating releases, labelled by outcome"
    );
    describe_counter!("retry_attempts_total", "Retry attempts");
    describe_counter!("retry_successes_total", "Operations that succeeded after retrying");
    describe_counter!("retry_exhausted_total", "Operations that exhausted their retries");

    describe_counter!("events_published_total", "Domain events published");
    describe_counter!("event_publish_errors_total", "Domain events that failed to publish");
}

/// Reservation lifecycle metrics recorder.
pub struct ReservationMetrics;

impl ReservationMetrics {
    /// Record a created reservation.
    pub fn record_created() {
        counter!("reservations_created_total").increment(1);
    }

    /// Record a cancelled reservation.
    pub fn record_cancelled() {
        counter!("reservations_cancelled_total").increment(1);
    }

    /// Record a rejected reservation request.
    pub fn record_rejected(reason: &'static str) {
        counter!("reservations_rejected_total", "reason" => reason).increment(1);
    }

    /// Record the duration of a service operation.
    pub fn record_operation(operation: &'static str, duration: Duration) {
        histogram!("service_operation_duration_seconds", "operation" => operation)
            .record(duration.as_secs_f64());
    }
}

/// Room inventory metrics recorder.
pub struct InventoryMetrics;

impl InventoryMetrics {
    /// Record room-nights reserved.
    pub fn record_reserved(room_nights: u64) {
        counter!("inventory_rooms_reserved_total").increment(room_nights);
    }

    /// Record room-nights released.
    pub fn record_released(room_nights: u64) {
        counter!("inventory_rooms_released_total").increment(room_nights);
    }

    /// Record a reserve attempt rejected for capacity.
    pub fn record_capacity_rejection() {
        counter!("inventory_capacity_rejections_total").increment(1);
    }
}

/// Waitlist metrics recorder.
pub struct WaitlistMetrics;

impl WaitlistMetrics {
    /// Record a new waitlist entry.
    pub fn record_added() {
        counter!("waitlist_entries_added_total").increment(1);
    }

    /// Record entries notified of freed rooms.
    pub fn record_notified(count: u64) {
        counter!("waitlist_notifications_total").increment(count);
    }
}

/// Compensating action metrics recorder.
pub struct CompensationMetrics;

impl CompensationMetrics {
    /// Record a compensation that restored inventory.
    pub fn record_succeeded() {
        counter!("compensations_total", "outcome" => "succeeded").increment(1);
    }

    /// Record a compensation that could not be completed.
    pub fn record_failed() {
        counter!("compensations_total", "outcome" => "failed").increment(1);
    }
}

/// Retry metrics recorder.
pub struct RetryMetrics;

impl RetryMetrics {
    /// Record a retry attempt.
    pub fn record_attempt() {
        counter!("retry_attempts_total").increment(1);
    }

    /// Record a successful retry.
    pub fn record_success() {
        counter!("retry_successes_total").increment(1);
    }

    /// Record exhausted retries.
    pub fn record_exhausted() {
        counter!("retry_exhausted_total").increment(1);
    }
}

/// Event publishing metrics recorder.
pub struct EventMetrics;

impl EventMetrics {
    /// Record a published event.
    pub fn record_published(topic: &str) {
        counter!("events_published_total", "topic" => topic.to_string()).increment(1);
    }

    /// Record a failed publish.
    pub fn record_publish_error() {
        counter!("event_publish_errors_total").increment(1);
    }
}
