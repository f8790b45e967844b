//! API Error Handling
//!
//! Unified error types and conversion for API responses.
//! Every error body carries the stable `code` alongside a readable message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::service::ServiceError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    /// Malformed path, query or body that never reached a service
    BadRequest(String),
    Service(ServiceError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Service(err) => match err {
                ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::Credentials(_)
                | ServiceError::Repository(_)
                | ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (code, message) = match self {
            ApiError::BadRequest(msg) => ("invalid_input", msg),
            ApiError::Service(ServiceError::Repository(err)) => {
                tracing::error!("Database error: {:?}", err);
                ("database_error", "Internal server error".to_string())
            }
            ApiError::Service(err) => {
                if status.is_server_error() {
                    tracing::error!("Internal error: {}", err);
                }
                (err.code(), err.to_string())
            }
        };

        (
            status,
            Json(serde_json::json!({ "code": code, "error": message })),
        )
            .into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
