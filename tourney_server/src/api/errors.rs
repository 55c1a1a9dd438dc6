//! Mapping of service errors onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tourney::{ErrorKind, ServiceError};

use crate::{logging, metrics};

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
}

/// Handler error wrapping a [`ServiceError`].
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

/// HTTP status for an error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
        ErrorKind::Store => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Cache => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        metrics::service_errors_total(kind);

        match kind {
            ErrorKind::Store => tracing::error!(error = %self.0, "Store failure"),
            ErrorKind::Cache => logging::log_cache_drift(kind.as_str(), &self.0.to_string()),
            _ => tracing::debug!(error = %self.0, "Request rejected"),
        }

        let body = ErrorResponse {
            error: self.0.client_message(),
            kind: kind.as_str(),
        };
        (status_for(kind), Json(body)).into_response()
    }
}

/// Result type for handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::Validation), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::Conflict), StatusCode::CONFLICT);
        assert_eq!(
            status_for(ErrorKind::InsufficientFunds),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            status_for(ErrorKind::Store),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(ErrorKind::Cache),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_conflict_response() {
        let response =
            ApiError(ServiceError::Conflict("tournament cannot be ended".to_string()))
                .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
