//! Catalog API — error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use catalog_core::error::{DispatchError, DomainError, RegistryError};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),

    /// Handler wiring failed.
    #[error("handler registration error: {0}")]
    Registry(#[from] RegistryError),

    /// Schema setup or broker wiring failed.
    #[error("startup error: {0}")]
    Startup(#[from] DomainError),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer error that implements `IntoResponse`.
#[derive(Debug)]
pub enum ApiError {
    /// The addressed resource does not exist.
    NotFound(String),
    /// A handler or entity rejected the request.
    Domain(DomainError),
    /// The request type has no handler. A wiring bug; details stay in logs.
    Internal,
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Handler(err) => Self::Domain(err),
            DispatchError::HandlerNotFound { request } => {
                error!(request, "request reached the API with no handler bound");
                Self::Internal
            }
            DispatchError::BindingMismatch { request } => {
                error!(request, "handler binding does not match its request type");
                Self::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            Self::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            Self::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "an internal error occurred".to_owned(),
            ),
            Self::Domain(err) => {
                let (status, code) = match &err {
                    DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
                    DomainError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
                    DomainError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "cancelled"),
                    DomainError::Infrastructure(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure_error")
                    }
                };
                (status, code, err.to_string())
            }
        };

        let body = ErrorBody {
            error: error_code,
            message,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn status_of(err: impl Into<ApiError>) -> StatusCode {
        let response = err.into().into_response();
        response.status()
    }

    #[test]
    fn test_not_found_maps_to_404() {
        assert_eq!(
            status_of(ApiError::NotFound("product missing".into())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_validation_maps_to_400() {
        assert_eq!(
            status_of(DomainError::Validation("bad input".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_conflict_maps_to_409() {
        assert_eq!(
            status_of(DomainError::Conflict("already tracked".into())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_cancelled_maps_to_503() {
        assert_eq!(
            status_of(DomainError::Cancelled),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_infrastructure_maps_to_500() {
        assert_eq!(
            status_of(DomainError::Infrastructure("db down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_handler_error_unwraps_to_its_domain_status() {
        assert_eq!(
            status_of(DispatchError::Handler(DomainError::Validation("x".into()))),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_handler_not_found_maps_to_500() {
        assert_eq!(
            status_of(DispatchError::HandlerNotFound { request: "Unbound" }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_binding_mismatch_maps_to_500() {
        assert_eq!(
            status_of(DispatchError::BindingMismatch { request: "Mismatched" }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
