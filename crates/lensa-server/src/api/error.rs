//! API error kinds and their JSON responses.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Failure surfaced to HTTP clients. Every variant renders as
/// `{"error": ..., "success": false}` with a matching status code.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The backing service failed to load at startup.
    #[error("{0} not available")]
    ServiceUnavailable(&'static str),

    /// Missing or malformed request data.
    #[error("{0}")]
    InvalidInput(String),

    /// Model or pipeline failure on valid input.
    #[error("Internal server error: {0}")]
    ProcessingError(String),

    #[error("Endpoint not found")]
    NotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Request body above the configured limit, in bytes.
    #[error("File too large. Maximum size is {}MB", .0 / (1024 * 1024))]
    PayloadTooLarge(usize),

    /// Legacy route; the payload is the new location.
    #[error("This endpoint has moved to {0}")]
    Moved(&'static str),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::ProcessingError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Moved(_) => StatusCode::MOVED_PERMANENTLY,
        }
    }
}

impl From<lensa_core::LensaError> for ApiError {
    fn from(e: lensa_core::LensaError) -> Self {
        ApiError::ProcessingError(e.to_string())
    }
}

impl From<lensa_core::VisionError> for ApiError {
    fn from(e: lensa_core::VisionError) -> Self {
        ApiError::ProcessingError(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.to_string();

        match self {
            ApiError::Moved(location) => (
                status,
                [(header::LOCATION, location)],
                Json(json!({
                    "error": error,
                    "success": false,
                    "redirect": location,
                    "message": "Please update your API calls to use the new endpoint structure",
                })),
            )
                .into_response(),
            ApiError::NotFound => (
                status,
                Json(json!({
                    "error": error,
                    "success": false,
                    "available_endpoints": super::endpoint_catalogue(),
                })),
            )
                .into_response(),
            _ => (status, Json(json!({ "error": error, "success": false }))).into_response(),
        }
    }
}
