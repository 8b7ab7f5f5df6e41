//! Prometheus metrics for observability and monitoring.
//!
//! This module provides metric collection for command execution:
//! - Command outcomes and latency
//! - Event publishing
//! - Version persistence
//!
//! # Example
//!
//! ```rust,no_run
//! use startlist_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Serve metrics on port 9090
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! // Metrics available at http://localhost:9090/metrics
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to bind the scrape endpoint
    #[error("Failed to bind metrics server: {0}")]
    Bind(String),
    /// No Tokio runtime to serve the scrape endpoint on
    #[error("Metrics server needs a Tokio runtime: {0}")]
    Runtime(String),
}

/// Prometheus metrics server.
///
/// Exposes metrics on an HTTP endpoint for Prometheus scraping, and renders
/// the same text in-process through [`render`](Self::render).
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Socket address the scrape endpoint is served on (e.g., `0.0.0.0:9090`)
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Address the scrape endpoint is served on.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Register metric descriptions, install the Prometheus recorder, and
    /// serve the scrape endpoint on [`addr`](Self::addr).
    ///
    /// Must be called from within a Tokio runtime; the endpoint runs as a task
    /// on that runtime.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Runtime`] outside a Tokio runtime,
    /// [`MetricsError::Bind`] if the address cannot be bound, and
    /// [`MetricsError::Build`] if the exporter cannot be built.
    ///
    /// # Note
    ///
    /// Only one recorder can be installed per process. A second call (for
    /// example from another test) logs a warning, releases its listener, and
    /// leaves this server without a handle.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| MetricsError::Runtime(e.to_string()))?;
        let (recorder, exporter) = {
            let _guard = runtime.enter();
            builder.build().map_err(|e| match e {
                BuildError::FailedToCreateHTTPListener(reason) => MetricsError::Bind(reason),
                other => MetricsError::Build(other.to_string()),
            })?
        };
        let handle = recorder.handle();

        if metrics::set_global_recorder(recorder).is_err() {
            tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
            return Ok(());
        }

        let addr = self.addr;
        runtime.spawn(async move {
            if exporter.await.is_err() {
                tracing::error!(addr = %addr, "Metrics endpoint stopped");
            }
        });
        self.handle = Some(handle);
        tracing::info!(
            addr = %self.addr,
            "Metrics server started - scrape at http://{}/metrics",
            self.addr
        );
        Ok(())
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
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
fn register_metrics() {
    describe_counter!(
        "startlist_commands_total",
        "Total number of startlist commands, labelled by outcome"
    );
    describe_histogram!(
        "startlist_command_duration_seconds",
        "Time taken to run a startlist command, including delivery"
    );
    describe_counter!(
        "startlist_events_published_total",
        "Total number of startlist events published"
    );
    describe_counter!(
        "startlist_publish_errors_total",
        "Total number of failed publish calls"
    );
    describe_counter!(
        "startlist_versions_saved_total",
        "Total number of confirmed versions persisted"
    );
    describe_counter!(
        "startlist_version_errors_total",
        "Total number of failed version saves"
    );
}

/// Command metrics recorder.
pub struct CommandMetrics;

impl CommandMetrics {
    /// Record a finished command.
    ///
    /// `outcome` is `"ok"` or [`CommandError::outcome`](crate::CommandError::outcome).
    pub fn record(outcome: &'static str, duration: Duration) {
        counter!("startlist_commands_total", "outcome" => outcome).increment(1);
        histogram!("startlist_command_duration_seconds").record(duration.as_secs_f64());
    }
}

/// Post-commit delivery metrics recorder.
pub struct DeliveryMetrics;

impl DeliveryMetrics {
    /// Record a successful publish of `count` events.
    pub fn record_published(count: usize) {
        counter!("startlist_events_published_total").increment(count as u64);
    }

    /// Record a failed publish.
    pub fn record_publish_error() {
        counter!("startlist_publish_errors_total").increment(1);
    }

    /// Record a persisted version.
    pub fn record_version_saved() {
        counter!("startlist_versions_saved_total").increment(1);
    }

    /// Record a failed version save.
    pub fn record_version_error() {
        counter!("startlist_version_errors_total").increment(1);
    }
}
