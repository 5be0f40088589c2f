//! Upstream error taxonomy and recoverability classification
//!
//! Every failure returned by a target API server is mapped onto an
//! [`UpstreamErrorKind`]. Aggregating callers consult one function,
//! [`UpstreamErrorKind::is_critical`], to decide whether the failure only
//! degrades a response (surfaced as a warning) or aborts it.
//!
//! An item class that is absent on a cluster (404) or that the caller may not
//! read (403) is non-critical. Everything else, including 401, is critical.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Classified kind of an upstream API-server failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UpstreamErrorKind {
    /// Resource or resource type does not exist (404)
    NotFound,
    /// Caller lacks permission for the resource (403)
    Forbidden,
    /// Credential rejected by the API server (401)
    Unauthorized,
    /// Write conflict (409)
    Conflict,
    /// Request rejected as malformed or invalid (400, 422)
    Invalid,
    /// Server-side or client-side deadline exceeded (408, 504, elapsed deadline)
    Timeout,
    /// Server overloaded or temporarily unavailable (429, 503)
    Unavailable,
    /// Connection-level failure before a response was received
    Transport,
    /// Any other server error or local processing failure
    Internal,
}

impl UpstreamErrorKind {
    /// Map an HTTP status code from an API server onto a kind
    pub fn from_status(code: u16) -> Self {
        match code {
            404 => Self::NotFound,
            403 => Self::Forbidden,
            401 => Self::Unauthorized,
            409 => Self::Conflict,
            400 | 422 => Self::Invalid,
            408 | 504 => Self::Timeout,
            429 | 503 => Self::Unavailable,
            _ => Self::Internal,
        }
    }

    /// Whether this kind aborts an aggregate response
    ///
    /// This is the single recoverability rule shared by every aggregator.
    pub fn is_critical(&self) -> bool {
        !matches!(self, Self::NotFound | Self::Forbidden)
    }

    /// Label value for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::Unauthorized => "unauthorized",
            Self::Conflict => "conflict",
            Self::Invalid => "invalid",
            Self::Timeout => "timeout",
            Self::Unavailable => "unavailable",
            Self::Transport => "transport",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for UpstreamErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure returned by (or on the way to) an upstream API server
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("upstream {kind} error: {message}")]
pub struct UpstreamError {
    /// Classified kind
    pub kind: UpstreamErrorKind,
    /// Human-readable message from the upstream server or transport
    pub message: String,
    /// HTTP status code when the server answered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
}

impl UpstreamError {
    /// Create an error of the given kind
    pub fn new(kind: UpstreamErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
        }
    }

    /// Create a timeout error (deadline elapsed or scope cancelled)
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(UpstreamErrorKind::Timeout, message)
    }

    /// Whether this error aborts an aggregate response
    pub fn is_critical(&self) -> bool {
        self.kind.is_critical()
    }
}

/// Classify a kube client error
pub fn classify(err: &kube::Error) -> UpstreamErrorKind {
    match err {
        kube::Error::Api(resp) => UpstreamErrorKind::from_status(resp.code),
        kube::Error::Auth(_) => UpstreamErrorKind::Unauthorized,
        kube::Error::HyperError(_) | kube::Error::Service(_) => UpstreamErrorKind::Transport,
        _ => UpstreamErrorKind::Internal,
    }
}

impl From<kube::Error> for UpstreamError {
    fn from(err: kube::Error) -> Self {
        let kind = classify(&err);
        let (message, code) = match &err {
            kube::Error::Api(resp) => (resp.message.clone(), Some(resp.code)),
            other => (other.to_string(), None),
        };
        Self {
            kind,
            message,
            code,
        }
    }
}

/// Result of splitting a set of errors by recoverability
#[derive(Debug, Default)]
pub struct ErrorPartition {
    /// Errors that degrade but do not fail the response
    pub warnings: Vec<UpstreamError>,
    /// First critical error encountered, if any
    pub critical: Option<UpstreamError>,
}

impl ErrorPartition {
    /// Record one error in the partition
    ///
    /// Only the first critical error is retained; later ones are dropped.
    pub fn push(&mut self, err: UpstreamError) {
        if err.is_critical() {
            if self.critical.is_none() {
                self.critical = Some(err);
            }
        } else {
            self.warnings.push(err);
        }
    }

    /// Convert into a result: `Err` with the critical error, or the warnings
    pub fn into_result(self) -> Result<Vec<UpstreamError>, UpstreamError> {
        match self.critical {
            Some(err) => Err(err),
            None => Ok(self.warnings),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: format!("status {}", code),
            reason: "Test".to_string(),
            code,
        })
    }

    #[rstest]
    #[case(404, UpstreamErrorKind::NotFound, false)]
    #[case(403, UpstreamErrorKind::Forbidden, false)]
    #[case(401, UpstreamErrorKind::Unauthorized, true)]
    #[case(409, UpstreamErrorKind::Conflict, true)]
    #[case(422, UpstreamErrorKind::Invalid, true)]
    #[case(504, UpstreamErrorKind::Timeout, true)]
    #[case(503, UpstreamErrorKind::Unavailable, true)]
    #[case(500, UpstreamErrorKind::Internal, true)]
    fn test_classify_api_status(
        #[case] code: u16,
        #[case] kind: UpstreamErrorKind,
        #[case] critical: bool,
    ) {
        let err = api_error(code);
        assert_eq!(classify(&err), kind);
        assert_eq!(kind.is_critical(), critical);
    }

    #[test]
    fn test_from_kube_error_keeps_message_and_code() {
        let err = UpstreamError::from(api_error(403));
        assert_eq!(err.kind, UpstreamErrorKind::Forbidden);
        assert_eq!(err.code, Some(403));
        assert_eq!(err.message, "status 403");
        assert!(!err.is_critical());
    }

    fn partition(errors: Vec<UpstreamError>) -> ErrorPartition {
        let mut out = ErrorPartition::default();
        for err in errors {
            out.push(err);
        }
        out
    }

    #[test]
    fn test_partition_keeps_first_critical() {
        let parts = partition(vec![
            UpstreamError::new(UpstreamErrorKind::NotFound, "no crd"),
            UpstreamError::new(UpstreamErrorKind::Internal, "boom"),
            UpstreamError::new(UpstreamErrorKind::Forbidden, "rbac"),
            UpstreamError::new(UpstreamErrorKind::Transport, "reset"),
        ]);

        assert_eq!(parts.warnings.len(), 2);
        let critical = parts.critical.unwrap();
        assert_eq!(critical.message, "boom");
    }

    #[test]
    fn test_partition_into_result() {
        let ok = partition(vec![UpstreamError::new(
            UpstreamErrorKind::NotFound,
            "missing",
        )])
        .into_result()
        .unwrap();
        assert_eq!(ok.len(), 1);

        let err = partition(vec![UpstreamError::timeout("deadline")])
            .into_result()
            .unwrap_err();
        assert_eq!(err.kind, UpstreamErrorKind::Timeout);
    }

    #[test]
    fn test_serialize_warning() {
        let err = UpstreamError::new(UpstreamErrorKind::NotFound, "gone");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "notFound");
        assert_eq!(json["message"], "gone");
        assert!(json.get("code").is_none());
    }
}
