//! Logging and OpenTelemetry export for the dashboard API
//!
//! Logs go to stdout as JSON (for log shippers) or compact text (for a
//! terminal). When an OTLP collector is configured, spans and the request
//! metrics in [`crate::metrics`] are exported to it as well. The returned
//! [`TelemetryGuard`] flushes both exporters on shutdown.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::TracerProvider;
use opentelemetry_sdk::{runtime, Resource};
use opentelemetry_semantic_conventions::resource::{
    K8S_NAMESPACE_NAME, K8S_POD_NAME, SERVICE_NAME, SERVICE_VERSION,
};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter used when neither `--log-filter` nor `RUST_LOG` is given
pub const DEFAULT_LOG_FILTER: &str =
    "info,dashboard_api=debug,dashboard_client=info,dashboard_resource=info,kube=warn,tower_http=warn,hyper=warn";

/// Telemetry setup failures
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// `--log-filter` is not a valid directive list
    #[error("invalid log filter {filter:?}: {message}")]
    InvalidFilter {
        /// Filter as given
        filter: String,
        /// Parser message
        message: String,
    },

    /// An OTLP exporter could not be built
    #[error("OTLP {signal} exporter: {message}")]
    Exporter {
        /// `span` or `metric`
        signal: &'static str,
        /// Builder message
        message: String,
    },

    /// Initialization ran twice
    #[error("a global subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

/// Log line encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, with the current span
    #[default]
    Json,
    /// Single-line human-readable events
    Text,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            other => Err(format!("unknown log format {:?}, expected json or text", other)),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Text => "text",
        })
    }
}

/// How the dashboard API reports about itself
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// `service.name` on exported spans and metrics
    pub service_name: String,
    /// Stdout encoding
    pub log_format: LogFormat,
    /// Overrides `RUST_LOG` when set
    pub log_filter: Option<String>,
    /// Collector address such as `http://otel-collector:4317`; logs only when unset
    pub otlp_endpoint: Option<String>,
    /// How often metrics are pushed to the collector
    pub metrics_interval: Duration,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "karmada-dashboard-api".to_string(),
            log_format: LogFormat::Json,
            log_filter: None,
            otlp_endpoint: None,
            metrics_interval: Duration::from_secs(30),
        }
    }
}

/// Keeps the OTLP providers alive; see [`TelemetryGuard::shutdown`]
#[must_use = "dropping the guard without shutdown loses buffered spans"]
#[derive(Default)]
pub struct TelemetryGuard {
    tracer: Option<TracerProvider>,
    meter: Option<SdkMeterProvider>,
}

impl TelemetryGuard {
    /// Whether spans and metrics leave the process
    pub fn is_exporting(&self) -> bool {
        self.tracer.is_some()
    }

    /// Flush buffered spans and metrics to the collector
    pub fn shutdown(self) {
        if let Some(tracer) = self.tracer {
            if let Err(e) = tracer.shutdown() {
                tracing::warn!(error = %e, "failed to flush spans");
            }
        }
        if let Some(meter) = self.meter {
            if let Err(e) = meter.shutdown() {
                tracing::warn!(error = %e, "failed to flush metrics");
            }
        }
    }
}

/// Install the global subscriber, and the OTLP exporters when configured
///
/// Call once, inside the tokio runtime; the batch exporters spawn onto it.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let filter = log_filter(
        config.log_filter.as_deref(),
        std::env::var("RUST_LOG").ok().as_deref(),
    )?;

    let mut guard = TelemetryGuard::default();
    let otel_layer = match &config.otlp_endpoint {
        Some(endpoint) => {
            global::set_text_map_propagator(TraceContextPropagator::new());
            let resource = service_resource(&config.service_name, |key| std::env::var(key).ok());

            let meter = meter_provider(endpoint, resource.clone(), config.metrics_interval)?;
            global::set_meter_provider(meter.clone());
            guard.meter = Some(meter);

            let tracer = tracer_provider(endpoint, resource)?;
            global::set_tracer_provider(tracer.clone());
            let layer = tracing_opentelemetry::layer().with_tracer(tracer.tracer("dashboard-api"));
            guard.tracer = Some(tracer);
            Some(layer)
        }
        None => None,
    };

    let (json, text) = match config.log_format {
        LogFormat::Json => (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            ),
            None,
        ),
        LogFormat::Text => (None, Some(tracing_subscriber::fmt::layer().compact())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .with(otel_layer)
        .try_init()
        .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;

    tracing::debug!(
        format = %config.log_format,
        exporting = guard.is_exporting(),
        "telemetry initialized"
    );
    Ok(guard)
}

/// Explicit filter first, then `RUST_LOG`, then [`DEFAULT_LOG_FILTER`]
///
/// An explicit filter that does not parse is an error; a bad `RUST_LOG`
/// falls back to the default.
fn log_filter(explicit: Option<&str>, from_env: Option<&str>) -> Result<EnvFilter, TelemetryError> {
    if let Some(filter) = explicit {
        return EnvFilter::try_new(filter).map_err(|e| TelemetryError::InvalidFilter {
            filter: filter.to_string(),
            message: e.to_string(),
        });
    }
    Ok(from_env
        .and_then(|f| EnvFilter::try_new(f).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER)))
}

/// Service identity plus the pod it runs in, from the downward API variables
fn service_resource(service_name: &str, env: impl Fn(&str) -> Option<String>) -> Resource {
    let mut attributes = vec![
        KeyValue::new(SERVICE_NAME, service_name.to_string()),
        KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
    ];
    for (var, key) in [("POD_NAME", K8S_POD_NAME), ("POD_NAMESPACE", K8S_NAMESPACE_NAME)] {
        if let Some(value) = env(var) {
            attributes.push(KeyValue::new(key, value));
        }
    }
    Resource::new(attributes)
}

fn tracer_provider(endpoint: &str, resource: Resource) -> Result<TracerProvider, TelemetryError> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| TelemetryError::Exporter {
            signal: "span",
            message: e.to_string(),
        })?;
    Ok(TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(resource)
        .build())
}

fn meter_provider(
    endpoint: &str,
    resource: Resource,
    interval: Duration,
) -> Result<SdkMeterProvider, TelemetryError> {
    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| TelemetryError::Exporter {
            signal: "metric",
            message: e.to_string(),
        })?;
    let reader = PeriodicReader::builder(exporter, runtime::Tokio)
        .with_interval(interval)
        .build();
    Ok(SdkMeterProvider::builder()
        .with_reader(reader)
        .with_resource(resource)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::Key;
    use rstest::rstest;

    #[rstest]
    #[case("json", LogFormat::Json)]
    #[case("JSON", LogFormat::Json)]
    #[case("text", LogFormat::Text)]
    fn test_log_format_parse(#[case] raw: &str, #[case] expected: LogFormat) {
        assert_eq!(raw.parse::<LogFormat>(), Ok(expected));
        assert_eq!(expected.to_string().parse::<LogFormat>(), Ok(expected));
    }

    #[test]
    fn test_log_format_rejects_unknown() {
        assert!("pretty".parse::<LogFormat>().unwrap_err().contains("json or text"));
    }

    #[test]
    fn test_explicit_filter_wins_over_env() {
        let filter = log_filter(Some("warn"), Some("trace")).unwrap();
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    fn test_env_filter_used_without_explicit() {
        let filter = log_filter(None, Some("dashboard_api=trace")).unwrap();
        assert_eq!(filter.to_string(), "dashboard_api=trace");
    }

    #[test]
    fn test_bad_env_filter_falls_back_to_default() {
        let filter = log_filter(None, Some("dashboard_api=loud")).unwrap();
        assert!(filter.to_string().contains("dashboard_api=debug"));
    }

    #[test]
    fn test_bad_explicit_filter_is_error() {
        let err = log_filter(Some("dashboard_api=loud"), None).unwrap_err();
        assert!(matches!(err, TelemetryError::InvalidFilter { .. }));
    }

    #[test]
    fn test_service_resource_includes_pod_when_known() {
        let resource = service_resource("karmada-dashboard-api", |var| match var {
            "POD_NAME" => Some("dashboard-api-5c9f7".to_string()),
            _ => None,
        });
        assert_eq!(
            resource.get(Key::new(SERVICE_NAME)).map(|v| v.to_string()),
            Some("karmada-dashboard-api".to_string())
        );
        assert_eq!(
            resource.get(Key::new(K8S_POD_NAME)).map(|v| v.to_string()),
            Some("dashboard-api-5c9f7".to_string())
        );
        assert!(resource.get(Key::new(K8S_NAMESPACE_NAME)).is_none());
    }

    #[test]
    fn test_guard_without_exporters() {
        let guard = TelemetryGuard::default();
        assert!(!guard.is_exporting());
        guard.shutdown();
    }
}
