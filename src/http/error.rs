//! API error type and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::error::GeocodeError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Error returned by handlers, rendered as `{"error": ..., "code": ...}`
#[derive(Debug, Clone, Error)]
#[error("[{status}] [{code}] {message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub code: &'static str,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>, code: &'static str) -> Self {
        Self {
            status,
            message: message.into(),
            code,
        }
    }

    /// 404 Not Found
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message, "NOT_FOUND")
    }

    /// 429 Too Many Requests
    pub fn rate_limited() -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            "rate limit exceeded",
            "RATE_LIMIT",
        )
    }

    /// 500 Internal Server Error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message, "INTERNAL_ERROR")
    }
}

impl From<GeocodeError> for ApiError {
    fn from(err: GeocodeError) -> Self {
        let message = err.to_string();
        match err {
            GeocodeError::StoreUnavailable(_) => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, message, "STORE_UNAVAILABLE")
            }
            GeocodeError::MalformedQuery(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, message, "MALFORMED_QUERY")
            }
            GeocodeError::Timeout(_) => {
                Self::new(StatusCode::GATEWAY_TIMEOUT, message, "TIMEOUT")
            }
            GeocodeError::Cancelled => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, message, "CANCELLED")
            }
            GeocodeError::Config(_) => Self::internal(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("{}", self);
        }
        let body = Json(json!({
            "error": self.message,
            "code": self.code,
        }));

        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (GeocodeError::StoreUnavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (GeocodeError::MalformedQuery("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (GeocodeError::Timeout(100), StatusCode::GATEWAY_TIMEOUT),
            (GeocodeError::Cancelled, StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
        assert_eq!(ApiError::rate_limited().status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ApiError::rate_limited().code, "RATE_LIMIT");
    }
}
