//! `/ocr` endpoints, backed by the image captioning service.

use std::sync::Arc;

use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use lensa_core::ImageToText;

use super::error::ApiError;
use super::state::AppState;
use super::upload::{
    decode_image, process_each, require_image, require_images, Base64Request, UploadForm,
};
use super::{blocking, fields_of};

const SERVICE: &str = "Image to Text Service";

fn captioner(state: &AppState) -> Result<Arc<ImageToText>, ApiError> {
    state.caption.clone().ok_or(ApiError::ServiceUnavailable(SERVICE))
}

pub async fn extract_text(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let captioner = captioner(&state)?;
    let mut form = UploadForm::read(multipart, state.max_upload_bytes).await?;
    let upload = require_image(&mut form)?;
    let max_length = form.usize_field("max_length");

    let filename = upload.filename.clone();
    let result = blocking(move || {
        let image = decode_image(&upload.data)?;
        Ok(captioner.caption(&image, max_length)?)
    })
    .await?;

    let mut results = fields_of(&result);
    results.insert("success".into(), Value::Bool(true));

    Ok(Json(json!({
        "success": true,
        "data": {
            "extracted_text": result.extracted_text,
            "text_length": result.text_length,
            "model_used": result.model_used,
            "filename": filename,
            "results": results,
        }
    })))
}

pub async fn extract_text_base64(
    State(state): State<AppState>,
    body: Result<Json<Base64Request>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let captioner = captioner(&state)?;
    let request = Base64Request::from_json(body, state.max_upload_bytes)?;
    let max_length = request.max_length()?;
    let image = request.image()?;

    let result = blocking(move || Ok(captioner.caption(&image, max_length)?)).await?;

    Ok(Json(json!({ "success": true, "data": result })))
}

pub async fn batch_extract_text(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let captioner = captioner(&state)?;
    let mut form = UploadForm::read(multipart, state.max_upload_bytes).await?;
    let uploads = require_images(&mut form)?;
    let max_length = form.usize_field("max_length");
    let total_files = uploads.len();

    let results = blocking(move || {
        Ok(process_each(uploads, |image| {
            captioner
                .caption(image, max_length)
                .map(|result| fields_of(&result))
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
        "service": "Image to Text (OCR)",
        "info": service_info(&state),
    }))
}

pub(crate) fn service_info(state: &AppState) -> Value {
    match &state.caption {
        Some(captioner) => json!({
            "model_name": captioner.model_name(),
            "default_max_length": captioner.default_max_length(),
            "model_loaded": true,
            "loaded": true,
        }),
        None => json!({ "loaded": false, "error": "Service not available" }),
    }
}
