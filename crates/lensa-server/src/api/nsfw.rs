//! `/nsfw` endpoints.

use std::sync::Arc;

use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use tracing::info;

use lensa_core::NsfwDetector;

use super::error::ApiError;
use super::state::AppState;
use super::upload::{
    decode_image, process_each, require_image, require_images, Base64Request, UploadForm,
};
use super::{blocking, fields_of};

const SERVICE: &str = "NSFW Detection Service";

fn detector(state: &AppState) -> Result<Arc<NsfwDetector>, ApiError> {
    state.nsfw.clone().ok_or(ApiError::ServiceUnavailable(SERVICE))
}

pub async fn detect(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let detector = detector(&state)?;
    let mut form = UploadForm::read(multipart, state.max_upload_bytes).await?;
    let upload = require_image(&mut form)?;

    let filename = upload.filename.clone();
    let report = blocking(move || {
        let image = decode_image(&upload.data)?;
        Ok(detector.detect(&image)?)
    })
    .await?;

    info!("{}: is_nsfw={} confidence={}", filename, report.is_nsfw, report.confidence);

    let mut data = fields_of(&report);
    data.insert("filename".into(), Value::String(filename));
    Ok(Json(json!({ "success": true, "data": data })))
}

pub async fn detect_base64(
    State(state): State<AppState>,
    body: Result<Json<Base64Request>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let detector = detector(&state)?;
    let request = Base64Request::from_json(body, state.max_upload_bytes)?;
    let image = request.image()?;

    let report = blocking(move || Ok(detector.detect(&image)?)).await?;

    Ok(Json(json!({ "success": true, "data": report })))
}

pub async fn batch_detect(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let detector = detector(&state)?;
    let mut form = UploadForm::read(multipart, state.max_upload_bytes).await?;
    let uploads = require_images(&mut form)?;
    let total_files = uploads.len();

    let results = blocking(move || {
        Ok(process_each(uploads, |image| {
            detector
                .detect(image)
                .map(|report| fields_of(&report))
                .map_err(|e| e.to_string())
        }))
    })
    .await?;

    Ok(Json(json!({
        "success": true,
        "total_files": total_files,
        "results": results,
    })))
}

pub async fn info(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "service": "NSFW Detection",
        "info": service_info(&state),
    }))
}

pub(crate) fn service_info(state: &AppState) -> Value {
    match &state.nsfw {
        Some(detector) => json!({
            "model_name": detector.model_name(),
            "threshold": detector.threshold(),
            "loaded": true,
        }),
        None => json!({ "loaded": false, "error": "Service not available" }),
    }
}
