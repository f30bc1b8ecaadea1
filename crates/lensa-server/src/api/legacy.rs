//! Pre-grouping endpoints, answered with a 301 pointing at their new home.

use axum::routing::post;
use axum::Router;

use super::error::ApiError;
use super::state::AppState;

/// Old path and its replacement.
pub const MOVED: [(&str, &str); 6] = [
    ("/detect-nsfw", "/nsfw/detect"),
    ("/detect-nsfw-base64", "/nsfw/detect-base64"),
    ("/batch-detect-nsfw", "/nsfw/batch-detect"),
    ("/extract-text", "/ocr/extract-text"),
    ("/extract-text-base64", "/ocr/extract-text-base64"),
    ("/batch-extract-text", "/ocr/batch-extract-text"),
];

pub fn routes() -> Router<AppState> {
    MOVED.iter().fold(Router::new(), |router, &(old, new)| {
        router.route(old, post(move || async move { ApiError::Moved(new) }))
    })
}
