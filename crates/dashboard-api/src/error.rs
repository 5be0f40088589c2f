//! HTTP error rendering

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dashboard_common::{UpstreamError, UpstreamErrorKind};
use tracing::warn;

/// Result type for API operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for API operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Client construction, authentication or authorization failure
    #[error(transparent)]
    Client(#[from] dashboard_client::Error),

    /// Aggregation, selection or view failure
    #[error(transparent)]
    Resource(#[from] dashboard_resource::Error),

    /// Invalid server configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

fn upstream_status(e: &UpstreamError) -> StatusCode {
    match e.kind {
        UpstreamErrorKind::NotFound => StatusCode::NOT_FOUND,
        UpstreamErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        UpstreamErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        UpstreamErrorKind::Forbidden => StatusCode::FORBIDDEN,
        _ => StatusCode::BAD_GATEWAY,
    }
}

fn client_status(e: &dashboard_client::Error) -> StatusCode {
    use dashboard_client::Error as C;
    match e {
        C::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        C::Forbidden(_) => StatusCode::FORBIDDEN,
        C::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        C::Upstream(u) => upstream_status(u),
        C::NotInitialized(_) | C::Construction(_) | C::Config(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl Error {
    /// HTTP status this error renders as
    pub fn status(&self) -> StatusCode {
        use dashboard_resource::Error as R;
        match self {
            Error::Client(e) => client_status(e),
            Error::Resource(R::Client(e)) => client_status(e),
            Error::Resource(R::Upstream(e)) => upstream_status(e),
            Error::Resource(R::InvalidQuery(_)) => StatusCode::BAD_REQUEST,
            Error::Resource(R::Decode { .. }) => StatusCode::BAD_GATEWAY,
            Error::Config(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %self, "request failed");
        }

        let body = serde_json::json!({
            "code": status.as_u16(),
            "message": self.to_string(),
            "data": null
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Error::Client(dashboard_client::Error::Unauthorized("no token".into())), 401)]
    #[case(Error::Client(dashboard_client::Error::Forbidden("member1".into())), 403)]
    #[case(Error::Client(dashboard_client::Error::NotInitialized("control-plane")), 500)]
    #[case(Error::Client(dashboard_client::Error::Construction("bad tls".into())), 500)]
    #[case(Error::Resource(dashboard_resource::Error::InvalidQuery("odd".into())), 400)]
    #[case(Error::Resource(UpstreamError::new(UpstreamErrorKind::NotFound, "gone").into()), 404)]
    #[case(Error::Resource(UpstreamError::timeout("slow").into()), 504)]
    #[case(Error::Resource(UpstreamError::new(UpstreamErrorKind::Unavailable, "busy").into()), 502)]
    #[case(Error::Resource(UpstreamError::new(UpstreamErrorKind::Transport, "reset").into()), 502)]
    #[case(Error::Internal("boom".into()), 500)]
    fn test_status_mapping(#[case] err: Error, #[case] expected: u16) {
        assert_eq!(err.status().as_u16(), expected);
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = Error::Client(dashboard_client::Error::Unauthorized("no token".into()))
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], 401);
        assert_eq!(json["message"], "unauthorized: no token");
        assert!(json["data"].is_null());
    }
}
