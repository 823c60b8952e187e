//! Prometheus metrics for the raffle engine.
//!
//! Metric families:
//! - Reservation attempts by outcome
//! - Owner overrides by kind
//! - Registry lifecycle (created, deleted, active raffles)
//! - Inventory reducer latency
//! - Live snapshot subscribers
//!
//! Recording goes through the `metrics` facade, so it is a no-op until a
//! recorder is installed with [`MetricsServer::start`].

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus recorder for the engine's metrics.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server for the given scrape address.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Describe every metric and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed. A recorder
    /// that is already installed (e.g. by another test) is not an error.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05, 0.1],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                register_metrics();
                tracing::info!(addr = %self.addr, "Metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this server did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        "raffle_reservations_total",
        "Reservation attempts by outcome (won, conflict, rejected)"
    );
    describe_counter!(
        "raffle_overrides_total",
        "Owner overrides applied by kind (sold, released)"
    );
    describe_counter!("raffle_created_total", "Raffles created");
    describe_counter!("raffle_deleted_total", "Raffles deleted");
    describe_counter!(
        "raffle_quota_rejections_total",
        "Raffle creations refused because the owner is at the limit"
    );
    describe_gauge!("raffle_active_raffles", "Raffles currently held by the registry");
    describe_gauge!(
        "raffle_snapshot_subscribers",
        "Open ticket snapshot subscriptions"
    );
    describe_histogram!(
        "raffle_reducer_duration_seconds",
        "Time spent reducing one inventory action under the lock"
    );
}

/// Outcome label of a reservation attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReservationLabel {
    /// The caller got the ticket
    Won,
    /// Someone else got the ticket first
    Conflict,
    /// Any other failure
    Rejected,
}

impl ReservationLabel {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Won => "won",
            Self::Conflict => "conflict",
            Self::Rejected => "rejected",
        }
    }
}

/// Reservation metrics recorder.
pub struct ReservationMetrics;

impl ReservationMetrics {
    /// Record one reservation attempt.
    pub fn record(label: ReservationLabel) {
        counter!("raffle_reservations_total", "outcome" => label.as_str()).increment(1);
    }

    /// Record an owner override.
    pub fn record_override(kind: &'static str) {
        counter!("raffle_overrides_total", "kind" => kind).increment(1);
    }
}

/// Registry metrics recorder.
pub struct RegistryMetrics;

impl RegistryMetrics {
    /// Record a created raffle and the new registry size.
    #[allow(clippy::cast_precision_loss)] // raffle counts stay far below 2^52
    pub fn record_created(total: usize) {
        counter!("raffle_created_total").increment(1);
        gauge!("raffle_active_raffles").set(total as f64);
    }

    /// Record a deleted raffle and the new registry size.
    #[allow(clippy::cast_precision_loss)] // raffle counts stay far below 2^52
    pub fn record_deleted(total: usize) {
        counter!("raffle_deleted_total").increment(1);
        gauge!("raffle_active_raffles").set(total as f64);
    }

    /// Record a creation refused by the quota.
    pub fn record_quota_rejection() {
        counter!("raffle_quota_rejections_total").increment(1);
    }
}

/// Inventory metrics recorder.
pub struct InventoryMetrics;

impl InventoryMetrics {
    /// Record the time spent in the reducer.
    pub fn record_reduce(duration: Duration) {
        histogram!("raffle_reducer_duration_seconds").record(duration.as_secs_f64());
    }
}

/// Keeps the subscriber gauge accurate for the lifetime of one subscription.
#[derive(Debug)]
pub struct SubscriberGuard(());

impl SubscriberGuard {
    /// Counts a new subscriber
    #[must_use]
    pub fn new() -> Self {
        gauge!("raffle_snapshot_subscribers").increment(1.0);
        Self(())
    }
}

impl Default for SubscriberGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        gauge!("raffle_snapshot_subscribers").decrement(1.0);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_recorder_is_a_no_op() {
        ReservationMetrics::record(ReservationLabel::Won);
        RegistryMetrics::record_created(1);
        drop(SubscriberGuard::new());
    }

    #[tokio::test]
    async fn test_metrics_server_render() {
        let mut server = MetricsServer::new("127.0.0.1:0".parse().unwrap());
        server.start().unwrap();

        ReservationMetrics::record(ReservationLabel::Conflict);
        ReservationMetrics::record_override("sold");

        // Another test may have installed the recorder first
        if let Some(rendered) = server.render() {
            assert!(rendered.contains("raffle_reservations_total"));
            assert!(rendered.contains("raffle_overrides_total"));
        }
    }
}
