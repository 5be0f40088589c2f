//! Error types for client construction, authentication, and authorization

use dashboard_common::UpstreamError;

/// Result type for client-layer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for client-layer operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No usable credential on the request or in the fallback store
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is not allowed to act on the target cluster
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Bootstrap configuration for the named target has not been set
    #[error("client configuration for {0} has not been initialized")]
    NotInitialized(&'static str),

    /// Building a client from an otherwise valid configuration failed
    #[error("failed to construct client: {0}")]
    Construction(String),

    /// Invalid or conflicting configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// A bounded wait elapsed
    #[error("timed out: {0}")]
    Timeout(String),

    /// Failure returned by an upstream API server
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl From<kube::Error> for Error {
    fn from(e: kube::Error) -> Self {
        Error::Upstream(UpstreamError::from(e))
    }
}
