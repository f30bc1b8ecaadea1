//! `/id-card` endpoints: detection, cropping, OCR and field parsing.

use std::sync::Arc;

use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Map, Value};
use tracing::info;

use lensa_core::{IdCardScan, IdCardService};

use super::error::ApiError;
use super::state::AppState;
use super::upload::{
    decode_image, process_each, require_image, require_images, Base64Request, UploadForm,
};
use super::{blocking, fields_of};

const SERVICE: &str = "ID Card Service";

pub const SUPPORTED_FORMATS: [&str; 6] = ["PNG", "JPG", "JPEG", "GIF", "BMP", "WEBP"];

pub const CAPABILITIES: [&str; 4] = [
    "ID Card Detection",
    "Text Extraction",
    "Structured Data Parsing",
    "Batch Processing",
];

/// Rounded to four decimals as `f64`.
fn round4(value: f32) -> f64 {
    (f64::from(value) * 10_000.0).round() / 10_000.0
}

fn service(state: &AppState) -> Result<Arc<IdCardService>, ApiError> {
    state.id_card.clone().ok_or(ApiError::ServiceUnavailable(SERVICE))
}

fn scan_data(scan: &IdCardScan) -> Map<String, Value> {
    let scores: Vec<f64> = scan.confidence_scores.iter().copied().map(round4).collect();

    let mut data = Map::new();
    data.insert("card_detected".into(), Value::Bool(scan.card_detected));
    data.insert("extracted_data".into(), Value::Object(fields_of(&scan.record)));
    data.insert(
        "confidence".into(),
        json!({
            "average": round4(scan.average_confidence),
            "individual_scores": scores,
        }),
    );
    data.insert(
        "processing_info".into(),
        json!({
            "bbox": scan.bbox,
            "total_text_items": scan.items.len(),
        }),
    );
    data
}

pub async fn detect_and_extract(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let service = service(&state)?;
    let mut form = UploadForm::read(multipart, state.max_upload_bytes).await?;
    let upload = require_image(&mut form)?;

    let filename = upload.filename.clone();
    let scan = blocking(move || {
        let image = decode_image(&upload.data)?;
        Ok(service.process(&image)?)
    })
    .await?;

    info!(
        "{}: card_detected={} fields={}",
        filename,
        scan.card_detected,
        scan.record.filled_count()
    );

    let mut data = scan_data(&scan);
    data.insert("filename".into(), Value::String(filename));
    Ok(Json(json!({ "success": true, "data": data })))
}

pub async fn detect_and_extract_base64(
    State(state): State<AppState>,
    body: Result<Json<Base64Request>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let service = service(&state)?;
    let request = Base64Request::from_json(body, state.max_upload_bytes)?;
    let image = request.image()?;

    let scan = blocking(move || Ok(service.process(&image)?)).await?;

    Ok(Json(json!({ "success": true, "data": scan_data(&scan) })))
}

pub async fn detect_only(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let service = service(&state)?;
    let mut form = UploadForm::read(multipart, state.max_upload_bytes).await?;
    let upload = require_image(&mut form)?;

    let filename = upload.filename.clone();
    let bbox = blocking(move || {
        let image = decode_image(&upload.data)?;
        Ok(service.detect(&image))
    })
    .await?;

    let message = if bbox.is_some() {
        "ID card detected"
    } else {
        "No ID card detected"
    };

    Ok(Json(json!({
        "success": true,
        "data": {
            "filename": filename,
            "card_detected": bbox.is_some(),
            "bbox": bbox,
            "message": message,
        }
    })))
}

pub async fn batch_process(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let service = service(&state)?;
    let mut form = UploadForm::read(multipart, state.max_upload_bytes).await?;
    let uploads = require_images(&mut form)?;
    let total_files = uploads.len();

    let results = blocking(move || {
        Ok(process_each(uploads, |image| {
            let scan = service.process(image).map_err(|e| e.to_string())?;
            let mut fields = Map::new();
            fields.insert("card_detected".into(), Value::Bool(scan.card_detected));
            fields.insert("extracted_data".into(), Value::Object(fields_of(&scan.record)));
            fields.insert("avg_confidence".into(), json!(round4(scan.average_confidence)));
            Ok(fields)
        }))
    })
    .await?;

    let successful = results
        .iter()
        .filter(|r| r["success"].as_bool().unwrap_or(false))
        .count();
    info!("Batch processed {} ID cards, {} succeeded", total_files, successful);

    Ok(Json(json!({
        "success": true,
        "total_files": total_files,
        "successful_extractions": successful,
        "results": results,
    })))
}

pub async fn info(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "service": "ID Card Detection and Extraction",
        "info": service_info(&state),
        "supported_formats": SUPPORTED_FORMATS,
        "capabilities": CAPABILITIES,
    }))
}

pub(crate) fn service_info(state: &AppState) -> Value {
    match &state.id_card {
        Some(service) => {
            let mut info = fields_of(&service.info());
            info.insert("loaded".into(), Value::Bool(true));
            Value::Object(info)
        }
        None => json!({ "loaded": false, "error": "Service not available" }),
    }
}
