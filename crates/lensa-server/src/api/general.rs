//! Catalogue, health and model information.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use super::state::AppState;
use super::{id_card, nsfw, ocr, ID_CARD_ENDPOINTS, NSFW_ENDPOINTS, OCR_ENDPOINTS};

pub const API_NAME: &str = "lensa image services API";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Paths of `"METHOD /path"` entries.
fn paths(endpoints: &[&'static str]) -> Vec<&'static str> {
    endpoints
        .iter()
        .map(|e| e.split_once(' ').map_or(*e, |(_, path)| path))
        .collect()
}

fn status(loaded: bool) -> Value {
    json!({
        "loaded": loaded,
        "status": if loaded { "healthy" } else { "unavailable" },
    })
}

fn with_endpoints(mut info: Value, endpoints: &[&'static str]) -> Value {
    if let Value::Object(map) = &mut info {
        map.insert("endpoints".into(), json!(paths(endpoints)));
    }
    info
}

pub async fn index(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": API_NAME,
        "version": VERSION,
        "services": {
            "nsfw_detection": {
                "available": state.nsfw.is_some(),
                "endpoints": paths(&NSFW_ENDPOINTS),
            },
            "image_to_text": {
                "available": state.caption.is_some(),
                "endpoints": paths(&OCR_ENDPOINTS),
            },
            "id_card_processing": {
                "available": state.id_card.is_some(),
                "endpoints": paths(&ID_CARD_ENDPOINTS),
            },
        },
        "general_endpoints": ["/health", "/model-info"],
        "documentation": "See README.md for detailed API documentation",
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": API_NAME,
        "version": VERSION,
        "services": {
            "nsfw_detection": status(state.nsfw.is_some()),
            "image_to_text": status(state.caption.is_some()),
            "id_card_processing": status(state.id_card.is_some()),
        },
    }))
}

/// Loaded services only; unavailable ones are `null`.
pub async fn model_info(State(state): State<AppState>) -> Json<Value> {
    let nsfw_service = state
        .nsfw
        .is_some()
        .then(|| with_endpoints(nsfw::service_info(&state), &NSFW_ENDPOINTS[..3]));
    let ocr_service = state
        .caption
        .is_some()
        .then(|| with_endpoints(ocr::service_info(&state), &OCR_ENDPOINTS[..3]));
    let id_card_service = state
        .id_card
        .is_some()
        .then(|| with_endpoints(id_card::service_info(&state), &ID_CARD_ENDPOINTS[..4]));

    Json(json!({
        "success": true,
        "version": VERSION,
        "models": {
            "nsfw_service": nsfw_service,
            "ocr_service": ocr_service,
            "id_card_service": id_card_service,
        },
    }))
}
