//! Router tests over stub services.

use std::io::Cursor;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::DynamicImage;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

use lensa_core::{
    BoundingBox, CaptionModel, CardDetector, IdCardService, ImageClassifier, ImageToText,
    NsfwDetector, OcrError, Polygon, Prediction, TextItem, TextReader, VisionError,
};
use lensa_server::{router, AppState};

const BOUNDARY: &str = "lensa-test-boundary";

struct FixedClassifier;

impl ImageClassifier for FixedClassifier {
    fn classify(&self, image: &DynamicImage) -> Result<Vec<Prediction>, VisionError> {
        if image.width() > 8 {
            return Err(VisionError::Preprocessing("image too wide".into()));
        }
        Ok(vec![
            Prediction { label: "nsfw".into(), score: 0.8 },
            Prediction { label: "normal".into(), score: 0.2 },
        ])
    }

    fn model_name(&self) -> &str {
        "stub-classifier"
    }
}

struct LengthCaption;

impl CaptionModel for LengthCaption {
    fn generate(&self, _: &DynamicImage, max_length: usize) -> Result<String, VisionError> {
        Ok(format!("  caption up to {} tokens ", max_length))
    }

    fn model_name(&self) -> &str {
        "stub-caption"
    }
}

struct KtpReader;

impl TextReader for KtpReader {
    fn read(&self, _: &DynamicImage) -> Result<Vec<TextItem>, OcrError> {
        let line = |text: &str, y: f32, conf: f32| {
            TextItem::new(text, conf, Polygon::from_rect(0.0, y, 50.0, y + 8.0))
        };
        Ok(vec![
            line("Jl. Merdeka No 5", 30.0, 0.8),
            line("NIK 3171234567890123", 0.0, 0.9),
            line("Nama: Budi Hartono", 10.0, 0.7),
        ])
    }

    fn name(&self) -> &str {
        "stub-ocr"
    }
}

struct TwoBoxes;

impl CardDetector for TwoBoxes {
    fn detect(&self, _: &DynamicImage) -> Result<Vec<BoundingBox>, VisionError> {
        Ok(vec![BoundingBox::new(0, 0, 2, 2), BoundingBox::new(1, 1, 5, 5)])
    }

    fn name(&self) -> &str {
        "stub-detector"
    }
}

fn full_state() -> AppState {
    AppState::new()
        .with_nsfw(NsfwDetector::new(Box::new(FixedClassifier)))
        .with_caption(ImageToText::new(Box::new(LengthCaption)))
        .with_id_card(IdCardService::new(Box::new(KtpReader)).with_detector(Box::new(TwoBoxes)))
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::new_rgb8(width, height)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

enum Part<'a> {
    File { name: &'a str, filename: &'a str, data: Vec<u8> },
    Text { name: &'a str, value: &'a str },
}

fn multipart_request(uri: &str, parts: Vec<Part<'_>>) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::File { name, filename, data } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(&data);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}", name, value)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn image_part(filename: &str, data: Vec<u8>) -> Part<'_> {
    Part::File { name: "image", filename, data }
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, header::HeaderMap, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, body)
}

#[tokio::test]
async fn test_missing_service_is_unavailable() {
    let app = router(AppState::new());
    let request = multipart_request("/nsfw/detect", vec![image_part("a.png", png(4, 4))]);

    let (status, _, body) = send(app, request).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body,
        json!({ "error": "NSFW Detection Service not available", "success": false })
    );
}

#[tokio::test]
async fn test_unknown_path_lists_endpoints() {
    let (status, _, body) = send(router(AppState::new()), get("/nope")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Endpoint not found");
    assert_eq!(body["success"], false);
    assert!(body["available_endpoints"]["id_card"].is_array());
}

#[tokio::test]
async fn test_wrong_method_is_json() {
    let (status, _, body) = send(router(full_state()), get("/nsfw/detect")).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body, json!({ "error": "Method not allowed", "success": false }));
}

#[tokio::test]
async fn test_legacy_route_moved() {
    let request = Request::builder()
        .method("POST")
        .uri("/extract-text-base64")
        .body(Body::empty())
        .unwrap();

    let (status, headers, body) = send(router(AppState::new()), request).await;

    assert_eq!(status, StatusCode::MOVED_PERMANENTLY);
    assert_eq!(headers[header::LOCATION], "/ocr/extract-text-base64");
    assert_eq!(body["redirect"], "/ocr/extract-text-base64");
    assert_eq!(body["error"], "This endpoint has moved to /ocr/extract-text-base64");
}

#[tokio::test]
async fn test_nsfw_detect_multipart() {
    let request = multipart_request("/nsfw/detect", vec![image_part("photo.JPG", png(4, 4))]);

    let (status, _, body) = send(router(full_state()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["filename"], "photo.JPG");
    assert_eq!(body["data"]["is_nsfw"], true);
    assert_eq!(body["data"]["predictions"][0]["label"], "nsfw");
}

#[tokio::test]
async fn test_nsfw_detect_base64() {
    let encoded = format!("data:image/png;base64,{}", BASE64.encode(png(4, 4)));
    let request = json_request("/nsfw/detect-base64", json!({ "image_base64": encoded }));

    let (status, _, body) = send(router(full_state()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_nsfw"], true);
    assert_eq!(body["data"]["threshold"], 0.5);
}

#[tokio::test]
async fn test_base64_input_errors() {
    let app = router(full_state());

    let (status, _, body) =
        send(app.clone(), json_request("/nsfw/detect-base64", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No base64 image data provided");

    let (status, _, body) = send(
        app,
        json_request("/ocr/extract-text-base64", json!({ "image_base64": "@@@" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid base64 image data"));
}

#[tokio::test]
async fn test_base64_max_length_must_be_integer() {
    let app = router(full_state());
    let encoded = BASE64.encode(png(4, 4));

    let (status, _, body) = send(
        app.clone(),
        json_request(
            "/ocr/extract-text-base64",
            json!({ "image_base64": encoded, "max_length": -1 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("max_length must be"));

    let (status, _, body) = send(
        app,
        json_request(
            "/ocr/extract-text-base64",
            json!({ "image_base64": encoded, "max_length": 12 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["extracted_text"], "caption up to 12 tokens");
}

#[tokio::test]
async fn test_single_upload_validation() {
    let app = router(full_state());

    let request = multipart_request("/ocr/extract-text", vec![image_part("notes.txt", png(4, 4))]);
    let (status, _, body) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "File type not allowed. Supported types: png, jpg, jpeg, gif, bmp, webp"
    );

    let request = multipart_request(
        "/ocr/extract-text",
        vec![Part::Text { name: "max_length", value: "20" }],
    );
    let (status, _, body) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No image file provided");
}

#[tokio::test]
async fn test_nsfw_batch_isolates_failures() {
    let request = multipart_request(
        "/nsfw/batch-detect",
        vec![
            Part::File { name: "images", filename: "a.png", data: png(4, 4) },
            Part::File { name: "images", filename: "b.txt", data: png(4, 4) },
            Part::File { name: "images", filename: "c.png", data: b"broken".to_vec() },
            Part::File { name: "images", filename: "wide.png", data: png(16, 4) },
            Part::File { name: "images", filename: "d.png", data: png(2, 2) },
        ],
    );

    let (status, _, body) = send(router(full_state()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_files"], 5);
    let results = body["results"].as_array().unwrap();
    let successes: Vec<bool> = results.iter().map(|r| r["success"] == true).collect();
    assert_eq!(successes, vec![true, false, false, false, true]);
    assert_eq!(results[1]["filename"], "b.txt");
    assert!(results[3]["error"].as_str().unwrap().contains("image too wide"));
    assert_eq!(results[4]["index"], 4);
}

#[tokio::test]
async fn test_extract_text_forwards_max_length() {
    let request = multipart_request(
        "/ocr/extract-text",
        vec![
            image_part("scan.png", png(4, 4)),
            Part::Text { name: "max_length", value: "20" },
        ],
    );

    let (status, _, body) = send(router(full_state()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["extracted_text"], "caption up to 20 tokens");
    assert_eq!(body["data"]["model_used"], "stub-caption");
    assert_eq!(body["data"]["filename"], "scan.png");
    assert_eq!(body["data"]["results"]["success"], true);
}

#[tokio::test]
async fn test_id_card_detect_and_extract() {
    let request = multipart_request(
        "/id-card/detect-and-extract",
        vec![image_part("ktp.png", png(8, 8))],
    );

    let (status, _, body) = send(router(full_state()), request).await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["filename"], "ktp.png");
    assert_eq!(data["card_detected"], true);
    assert_eq!(data["processing_info"]["bbox"], json!([1, 1, 5, 5]));
    assert_eq!(data["processing_info"]["total_text_items"], 3);
    assert_eq!(data["extracted_data"]["id_number"], "NIK 3171234567890123");
    assert_eq!(data["extracted_data"]["name"], ": Budi Hartono");
    assert_eq!(data["extracted_data"]["religion"], "");
    assert_eq!(
        data["extracted_data"]["raw_text"],
        json!(["NIK 3171234567890123", "Nama: Budi Hartono", "Jl. Merdeka No 5"])
    );
    assert_eq!(data["confidence"]["average"], 0.8);
}

#[tokio::test]
async fn test_id_card_detect_only_without_detector() {
    let state = AppState::new().with_id_card(IdCardService::new(Box::new(KtpReader)));
    let request = multipart_request("/id-card/detect-only", vec![image_part("ktp.png", png(8, 8))]);

    let (status, _, body) = send(router(state), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["card_detected"], false);
    assert_eq!(body["data"]["bbox"], Value::Null);
    assert_eq!(body["data"]["message"], "No ID card detected");
}

#[tokio::test]
async fn test_id_card_batch_counts_successes() {
    let request = multipart_request(
        "/id-card/batch-process",
        vec![
            Part::File { name: "images", filename: "a.png", data: png(8, 8) },
            Part::File { name: "images", filename: "b.gif", data: b"nope".to_vec() },
        ],
    );

    let (status, _, body) = send(router(full_state()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_files"], 2);
    assert_eq!(body["successful_extractions"], 1);
    assert_eq!(body["results"][0]["avg_confidence"], 0.8);
    assert_eq!(body["results"][1]["success"], false);
}

#[tokio::test]
async fn test_oversized_upload_rejected() {
    let state = full_state().with_max_upload_bytes(1024 * 1024);
    let request = multipart_request(
        "/nsfw/detect",
        vec![image_part("big.png", vec![0u8; 2 * 1024 * 1024])],
    );

    let (status, _, body) = send(router(state), request).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "File too large. Maximum size is 1MB");
}

#[tokio::test]
async fn test_catalogue_and_health_reflect_availability() {
    let state = AppState::new().with_caption(ImageToText::new(Box::new(LengthCaption)));
    let app = router(state);

    let (status, _, body) = send(app.clone(), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["services"]["image_to_text"]["available"], true);
    assert_eq!(body["services"]["nsfw_detection"]["available"], false);

    let (_, _, body) = send(app.clone(), get("/health")).await;
    assert_eq!(body["services"]["image_to_text"]["status"], "healthy");
    assert_eq!(body["services"]["id_card_processing"]["status"], "unavailable");

    let (_, _, body) = send(app.clone(), get("/model-info")).await;
    assert_eq!(body["models"]["ocr_service"]["model_name"], "stub-caption");
    assert_eq!(body["models"]["nsfw_service"], Value::Null);

    let (_, _, body) = send(app, get("/nsfw/info")).await;
    assert_eq!(body["info"], json!({ "loaded": false, "error": "Service not available" }));
}
