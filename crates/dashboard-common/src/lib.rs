//! Common building blocks for the multi-cluster dashboard API
//!
//! - [`error`] - upstream error taxonomy and the shared critical/non-critical rule
//! - [`telemetry`] - JSON or text logging and optional OTLP export
//! - [`metrics`] - OpenTelemetry counters and histograms

#![deny(missing_docs)]

pub mod error;
pub mod metrics;
pub mod telemetry;

pub use error::{classify, ErrorPartition, UpstreamError, UpstreamErrorKind};

/// Reserved cluster name addressing the management (host) cluster directly
pub const MGMT_CLUSTER_NAME: &str = "mgmt-cluster";

/// Namespace holding the control plane's own components
pub const KARMADA_SYSTEM_NAMESPACE: &str = "karmada-system";
