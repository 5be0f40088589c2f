//! OpenTelemetry metrics for the dashboard API core
//!
//! - Cluster authorization decisions
//! - Resource list calls issued by aggregates
//! - API client constructions

use std::time::Duration;

use once_cell::sync::Lazy;
use opentelemetry::global;
use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::KeyValue;

static METER: Lazy<Meter> = Lazy::new(|| global::meter("karmada-dashboard"));

/// Counter of cluster authorization decisions
///
/// Labels:
/// - `decision`: allow, deny, error, bypass
pub static AUTHZ_DECISIONS: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("dashboard_cluster_authz_decisions_total")
        .with_description("Cluster access decisions by outcome")
        .with_unit("{decisions}")
        .build()
});

/// Counter of resource list calls made by aggregates
///
/// Labels:
/// - `kind`: resource kind
/// - `outcome`: ok, warning, critical
pub static LIST_CALLS: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("dashboard_resource_list_calls_total")
        .with_description("Resource list calls issued by aggregates")
        .with_unit("{calls}")
        .build()
});

/// Histogram of resource list call latency
///
/// Labels:
/// - `kind`: resource kind
pub static LIST_DURATION: Lazy<Histogram<f64>> = Lazy::new(|| {
    METER
        .f64_histogram("dashboard_resource_list_duration_seconds")
        .with_description("Duration of resource list calls in seconds")
        .with_unit("s")
        .build()
});

/// Counter of API client constructions
///
/// Labels:
/// - `target`: control_plane, api_server, member, identity
pub static CLIENT_CONSTRUCTIONS: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("dashboard_client_constructions_total")
        .with_description("API clients built, by target class")
        .with_unit("{clients}")
        .build()
});

/// Outcome of a cluster authorization check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthzDecision {
    /// Policy allowed access
    Allow,
    /// Policy denied access
    Deny,
    /// Policy check failed
    Error,
    /// No username or no policy configured
    Bypass,
}

impl AuthzDecision {
    /// Convert to label value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
            Self::Error => "error",
            Self::Bypass => "bypass",
        }
    }
}

/// Outcome of a single list call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOutcome {
    /// Items returned
    Ok,
    /// Non-critical failure
    Warning,
    /// Critical failure
    Critical,
}

impl ListOutcome {
    /// Convert to label value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

/// Record a cluster authorization decision
pub fn record_authz_decision(decision: AuthzDecision) {
    AUTHZ_DECISIONS.add(1, &[KeyValue::new("decision", decision.as_str())]);
}

/// Record a completed list call
pub fn record_list_call(kind: &str, outcome: ListOutcome, elapsed: Duration) {
    LIST_CALLS.add(
        1,
        &[
            KeyValue::new("kind", kind.to_string()),
            KeyValue::new("outcome", outcome.as_str()),
        ],
    );
    LIST_DURATION.record(
        elapsed.as_secs_f64(),
        &[KeyValue::new("kind", kind.to_string())],
    );
}

/// Record an API client construction
pub fn record_client_construction(target: &'static str) {
    CLIENT_CONSTRUCTIONS.add(1, &[KeyValue::new("target", target)]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_values() {
        assert_eq!(AuthzDecision::Allow.as_str(), "allow");
        assert_eq!(AuthzDecision::Bypass.as_str(), "bypass");
        assert_eq!(ListOutcome::Warning.as_str(), "warning");
    }

    #[test]
    fn test_recording_without_provider_is_noop() {
        // The global meter provider defaults to a no-op implementation
        record_authz_decision(AuthzDecision::Deny);
        record_list_call("Pod", ListOutcome::Ok, Duration::from_millis(5));
        record_client_construction("member");
    }
}
