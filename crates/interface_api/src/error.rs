//! API error handling
//!
//! Failures are rendered with the same envelope the services return, so
//! clients parse one body shape whatever went wrong.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use core_kernel::{ErrorCode, FieldError, OperationResult};

/// Errors raised by the HTTP layer before an operation reaches the services
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    fn code(&self) -> ErrorCode {
        match self {
            ApiError::Unauthorized(_) => ErrorCode::PermissionDenied,
            ApiError::BadRequest(_) => ErrorCode::ValidationError,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// HTTP status mirroring an error code
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::PermissionDenied => StatusCode::FORBIDDEN,
        ErrorCode::DuplicateEntry | ErrorCode::InvalidState => StatusCode::CONFLICT,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body: OperationResult<()> = OperationResult {
            success: false,
            data: None,
            errors: vec![FieldError::general(self.to_string(), self.code())],
        };
        (self.status(), Json(body)).into_response()
    }
}
