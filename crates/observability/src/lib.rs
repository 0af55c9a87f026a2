//! # Observability
//!
//! Logging, metrics and run statistics shared by every relay task.
//!
//! ## Features
//!
//! - `tracing` subscriber with an `EnvFilter` and JSON, pretty or compact output
//! - Prometheus exporter; every series carries a `service` label
//! - `sensor_relay_*` metric helpers (see [`metrics`])
//! - In-memory throughput statistics for end-of-run summaries
//!
//! ## Usage
//!
//! ```ignore
//! use observability::{LogFormat, ObservabilityConfig};
//!
//! observability::init_with_config(
//!     ObservabilityConfig::new("uploader").with_format(LogFormat::Compact),
//! )?;
//! observability::record_packet_sent("personal_video", encoded.len());
//! ```

pub mod metrics;
mod stats;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use crate::metrics::{
    record_file_packet, record_genlock_dropped, record_packet_received, record_packet_sent,
    record_session_closed, record_session_failure, record_session_opened,
};
pub use crate::stats::{RunningStats, StatsSummary, ThroughputAggregator, ThroughputSummary};

/// Logging and metrics setup for one process
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Value of the `service` label on every metric
    pub service: String,
    pub log_format: LogFormat,
    /// Prometheus listen port; `None` keeps metrics in-process only
    pub metrics_port: Option<u16>,
    /// Filter directive used when `RUST_LOG` is unset
    pub default_filter: String,
}

impl ObservabilityConfig {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Self::default()
        }
    }

    pub fn with_format(mut self, log_format: LogFormat) -> Self {
        self.log_format = log_format;
        self
    }

    pub fn with_metrics_port(mut self, port: u16) -> Self {
        self.metrics_port = Some(port);
        self
    }

    pub fn without_metrics(mut self) -> Self {
        self.metrics_port = None;
        self
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service: "sensor_relay".to_string(),
            log_format: LogFormat::Json,
            metrics_port: Some(9000),
            default_filter: "info".to_string(),
        }
    }
}

/// Log line layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One flattened JSON object per event
    #[default]
    Json,
    Pretty,
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        [
            ("json", Self::Json),
            ("pretty", Self::Pretty),
            ("compact", Self::Compact),
        ]
        .into_iter()
        .find(|(name, _)| s.eq_ignore_ascii_case(name))
        .map(|(_, format)| format)
        .ok_or_else(|| format!("unknown log format '{s}' (expected json, pretty or compact)"))
    }
}

/// Default setup: JSON logs and the exporter on port 9000
pub fn init() -> Result<()> {
    init_with_config(ObservabilityConfig::default())
}

/// Install the global subscriber and, if a port is set, the exporter
///
/// # Errors
/// Fails when a subscriber or recorder is already installed, when the
/// default filter does not parse, or when the exporter cannot bind.
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.default_filter)
            .with_context(|| format!("invalid log filter '{}'", config.default_filter))?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.log_format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_thread_names(true))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(false))
            .try_init(),
    };
    installed.context("a global tracing subscriber is already installed")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(&config.service, port)?;
    }

    tracing::info!(
        service = %config.service,
        format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "observability ready"
    );
    Ok(())
}

/// Install only the Prometheus exporter on `0.0.0.0:port`
pub fn init_metrics_only(service: &str, port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .add_global_label("service", service)
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .with_context(|| format!("cannot start Prometheus exporter on port {port}"))?;

    tracing::info!(port, "serving metrics");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = ObservabilityConfig::new("gatherer")
            .with_format(LogFormat::Pretty)
            .without_metrics();
        assert_eq!(config.service, "gatherer");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.metrics_port, None);
        assert_eq!(config.default_filter, "info");

        let exported = ObservabilityConfig::default().with_metrics_port(9100);
        assert_eq!(exported.metrics_port, Some(9100));
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("COMPACT".parse::<LogFormat>(), Ok(LogFormat::Compact));
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        let err = "xml".parse::<LogFormat>().unwrap_err();
        assert!(err.contains("xml"));
    }
}
