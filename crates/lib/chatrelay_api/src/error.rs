//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chatrelay_core::relay::RelayError;
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::StoreUnavailable(m) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "store_unavailable",
                m.as_str(),
            ),
            AppError::Internal(detail) => {
                error!(error = %detail, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<RelayError> for AppError {
    fn from(e: RelayError) -> Self {
        match e {
            RelayError::InvalidInput(msg) => AppError::Validation(msg),
            RelayError::Persistence(e) => AppError::Internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chatrelay_core::store::PersistenceError;

    use super::*;

    #[test]
    fn invalid_input_is_bad_request() {
        let resp = AppError::from(RelayError::InvalidInput("Email is required".into()))
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn persistence_failure_is_internal() {
        let err = AppError::from(RelayError::Persistence(PersistenceError::Unavailable(
            "connection refused".into(),
        )));
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn store_unavailable_is_service_unavailable() {
        let resp = AppError::StoreUnavailable("down".into()).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
