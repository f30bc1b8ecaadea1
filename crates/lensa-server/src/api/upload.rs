//! Image uploads: multipart forms, base64 bodies and per-file batch isolation.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::DynamicImage;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::error::ApiError;

pub const ALLOWED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "webp"];

pub const FILE_TYPE_NOT_ALLOWED: &str =
    "File type not allowed. Supported types: png, jpg, jpeg, gif, bmp, webp";

/// Whether the extension after the last `.` is an accepted image type.
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// One uploaded file part.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub data: Bytes,
}

/// A multipart form read fully into memory.
#[derive(Debug, Default)]
pub struct UploadForm {
    files: Vec<(String, Upload)>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    /// Read every part. Parts with a filename are files, the rest text fields.
    pub async fn read(
        multipart: Result<Multipart, MultipartRejection>,
        limit: usize,
    ) -> Result<Self, ApiError> {
        let mut multipart = multipart.map_err(|e| {
            debug!("Multipart rejected: {}", e);
            ApiError::InvalidInput("No image file provided".to_string())
        })?;

        let mut form = UploadForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(e, limit))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let data = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
                    form.files.push((name, Upload { filename, data }));
                }
                None => {
                    let text = field.text().await.map_err(|e| multipart_error(e, limit))?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }

    /// First file uploaded under `name`.
    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        let index = self.files.iter().position(|(n, _)| n == name)?;
        Some(self.files.remove(index).1)
    }

    /// Every file uploaded under `name`, in request order.
    pub fn take_files(&mut self, name: &str) -> Vec<Upload> {
        let (matching, rest) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|(n, _)| n == name);
        self.files = rest;
        matching.into_iter().map(|(_, upload)| upload).collect()
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Optional integer text field; unparsable values are ignored.
    pub fn usize_field(&self, name: &str) -> Option<usize> {
        self.field(name).and_then(|v| v.trim().parse().ok())
    }
}

fn multipart_error(e: MultipartError, limit: usize) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(limit)
    } else {
        ApiError::InvalidInput(format!("Invalid multipart body: {}", e.body_text()))
    }
}

/// The single `image` file of a request, validated.
pub fn require_image(form: &mut UploadForm) -> Result<Upload, ApiError> {
    let upload = form
        .take_file("image")
        .ok_or_else(|| ApiError::InvalidInput("No image file provided".to_string()))?;

    if upload.filename.is_empty() {
        return Err(ApiError::InvalidInput("No image file selected".to_string()));
    }
    if !allowed_file(&upload.filename) {
        return Err(ApiError::InvalidInput(FILE_TYPE_NOT_ALLOWED.to_string()));
    }
    Ok(upload)
}

/// The `images` files of a batch request; at least one is required.
pub fn require_images(form: &mut UploadForm) -> Result<Vec<Upload>, ApiError> {
    let uploads = form.take_files("images");
    if uploads.is_empty() {
        return Err(ApiError::InvalidInput("No image files provided".to_string()));
    }
    Ok(uploads)
}

pub fn decode_image(data: &[u8]) -> Result<DynamicImage, ApiError> {
    image::load_from_memory(data)
        .map_err(|e| ApiError::InvalidInput(format!("Invalid image file: {}", e)))
}

/// JSON body of the base64 endpoints.
#[derive(Debug, Deserialize)]
pub struct Base64Request {
    pub image_base64: Option<String>,
    #[serde(default)]
    max_length: Value,
}

impl Base64Request {
    pub fn from_json(
        body: Result<axum::Json<Base64Request>, JsonRejection>,
        limit: usize,
    ) -> Result<Self, ApiError> {
        match body {
            Ok(axum::Json(request)) => Ok(request),
            Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                Err(ApiError::PayloadTooLarge(limit))
            }
            Err(e) => {
                debug!("JSON body rejected: {}", e);
                Err(no_base64_data())
            }
        }
    }

    pub fn image(&self) -> Result<DynamicImage, ApiError> {
        let encoded = self.image_base64.as_deref().ok_or_else(no_base64_data)?;
        decode_base64_image(encoded)
    }

    /// Requested caption length; absent or `null` means the default.
    pub fn max_length(&self) -> Result<Option<usize>, ApiError> {
        match &self.max_length {
            Value::Null => Ok(None),
            value => value
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| {
                    ApiError::InvalidInput(format!(
                        "max_length must be a non-negative integer, got {}",
                        value
                    ))
                }),
        }
    }
}

fn no_base64_data() -> ApiError {
    ApiError::InvalidInput("No base64 image data provided".to_string())
}

/// Decode a base64 image, tolerating whitespace and a `data:` URL prefix.
pub fn decode_base64_image(encoded: &str) -> Result<DynamicImage, ApiError> {
    let payload = match encoded.split_once(',') {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => encoded,
    };
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();

    let bytes = BASE64
        .decode(compact.as_bytes())
        .map_err(|e| ApiError::InvalidInput(format!("Invalid base64 image data: {}", e)))?;
    image::load_from_memory(&bytes)
        .map_err(|e| ApiError::InvalidInput(format!("Invalid base64 image data: {}", e)))
}

/// Run `process` on every upload independently.
///
/// Each entry carries `index`, `filename` and `success`; failures add an
/// `error` message and never stop the remaining files.
pub fn process_each<F>(uploads: Vec<Upload>, mut process: F) -> Vec<Value>
where
    F: FnMut(&DynamicImage) -> Result<Map<String, Value>, String>,
{
    uploads
        .into_iter()
        .enumerate()
        .map(|(index, upload)| {
            let outcome = if upload.filename.is_empty() {
                Err("Empty filename".to_string())
            } else if !allowed_file(&upload.filename) {
                Err(FILE_TYPE_NOT_ALLOWED.to_string())
            } else {
                image::load_from_memory(&upload.data)
                    .map_err(|e| e.to_string())
                    .and_then(|image| process(&image))
            };

            let mut entry = match outcome {
                Ok(fields) => {
                    let mut entry = fields;
                    entry.insert("success".into(), Value::Bool(true));
                    entry
                }
                Err(error) => {
                    let mut entry = Map::new();
                    entry.insert("error".into(), Value::String(error));
                    entry.insert("success".into(), Value::Bool(false));
                    entry
                }
            };
            entry.insert("index".into(), Value::from(index));
            entry.insert("filename".into(), Value::String(upload.filename));
            Value::Object(entry)
        })
        .collect()
}
