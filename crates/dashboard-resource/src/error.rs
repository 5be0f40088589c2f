//! Error types for resource aggregation and views

use dashboard_common::UpstreamError;

/// Result type for resource operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for resource operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Client construction, authentication or authorization failure
    #[error(transparent)]
    Client(#[from] dashboard_client::Error),

    /// Critical upstream failure
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// Malformed selection query
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Upstream object could not be decoded into its view
    #[error("failed to decode {kind}: {message}")]
    Decode {
        /// Resource kind being decoded
        kind: &'static str,
        /// Decoder message
        message: String,
    },
}

impl From<kube::Error> for Error {
    fn from(e: kube::Error) -> Self {
        Error::Upstream(UpstreamError::from(e))
    }
}
