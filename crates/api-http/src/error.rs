//! Error mapping
//!
//! Converts AppError into JSON error responses `{error, message}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use drover_core::error::AppError;
use serde_json::json;

pub fn app_error_to_response(err: AppError) -> Response {
    match err {
        AppError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_argument", msg),
        AppError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        AppError::RateLimited(msg) => {
            json_error(StatusCode::TOO_MANY_REQUESTS, "rate_limited", msg)
        }
        AppError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        other => {
            // Transient store and internal errors: log, do not leak details
            tracing::error!(error = %other, "Request failed");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal server error",
            )
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
