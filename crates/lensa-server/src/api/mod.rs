//! REST API over the lensa services.
//!
//! Routes are grouped per service (`/nsfw`, `/ocr`, `/id-card`) plus the
//! general catalogue and health endpoints. Every response is JSON carrying a
//! `success` flag.

pub mod error;
pub mod general;
pub mod id_card;
pub mod legacy;
pub mod nsfw;
pub mod ocr;
pub mod state;
pub mod upload;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware::map_response;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Map, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use error::ApiError;
use state::AppState;

pub const NSFW_ENDPOINTS: [&str; 4] = [
    "POST /nsfw/detect",
    "POST /nsfw/detect-base64",
    "POST /nsfw/batch-detect",
    "GET /nsfw/info",
];

pub const OCR_ENDPOINTS: [&str; 4] = [
    "POST /ocr/extract-text",
    "POST /ocr/extract-text-base64",
    "POST /ocr/batch-extract-text",
    "GET /ocr/info",
];

pub const ID_CARD_ENDPOINTS: [&str; 5] = [
    "POST /id-card/detect-and-extract",
    "POST /id-card/detect-and-extract-base64",
    "POST /id-card/detect-only",
    "POST /id-card/batch-process",
    "GET /id-card/info",
];

pub const GENERAL_ENDPOINTS: [&str; 3] = ["GET /", "GET /health", "GET /model-info"];

/// Endpoints grouped by service, as listed by `/` and the 404 body.
pub fn endpoint_catalogue() -> Value {
    json!({
        "general": GENERAL_ENDPOINTS,
        "nsfw": NSFW_ENDPOINTS,
        "ocr": OCR_ENDPOINTS,
        "id_card": ID_CARD_ENDPOINTS,
    })
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route("/", get(general::index))
        .route("/health", get(general::health))
        .route("/model-info", get(general::model_info))
        .route("/nsfw/detect", post(nsfw::detect))
        .route("/nsfw/detect-base64", post(nsfw::detect_base64))
        .route("/nsfw/batch-detect", post(nsfw::batch_detect))
        .route("/nsfw/info", get(nsfw::info))
        .route("/ocr/extract-text", post(ocr::extract_text))
        .route("/ocr/extract-text-base64", post(ocr::extract_text_base64))
        .route("/ocr/batch-extract-text", post(ocr::batch_extract_text))
        .route("/ocr/info", get(ocr::info))
        .route("/id-card/detect-and-extract", post(id_card::detect_and_extract))
        .route(
            "/id-card/detect-and-extract-base64",
            post(id_card::detect_and_extract_base64),
        )
        .route("/id-card/detect-only", post(id_card::detect_only))
        .route("/id-card/batch-process", post(id_card::batch_process))
        .route("/id-card/info", get(id_card::info))
        .merge(legacy::routes())
        .fallback(not_found)
        .layer(map_response(json_method_not_allowed))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Method mismatches on known paths come back from axum with an empty body.
async fn json_method_not_allowed(response: Response) -> Response {
    if response.status() == StatusCode::METHOD_NOT_ALLOWED {
        ApiError::MethodNotAllowed.into_response()
    } else {
        response
    }
}

/// Run model inference off the async executor.
pub(crate) async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::ProcessingError(e.to_string()))?
}

/// Object fields of a serializable value; anything else yields no fields.
pub(crate) fn fields_of<T: serde::Serialize>(value: &T) -> Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}
