// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /v1/parse

use super::support::*;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use screen_parser::vision::decode_base64_rgb;
use tower::util::ServiceExt;

fn parse_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/v1/parse")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_parse_success() {
    let response = app()
        .oneshot(parse_request(serde_json::json!({
            "image": screenshot_base64(),
            "boxThreshold": 0.05,
            "iouThreshold": 0.1,
            "language": "en"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;

    assert_eq!(json["parsedText"], "Text Box ID 0: OK");
    assert_eq!(json["parsedElements"].as_array().unwrap().len(), 1);
    assert_eq!(json["effectiveLanguage"], "en");
    assert_eq!(json["width"], 48);
    assert_eq!(json["height"], 32);
    assert!(!json["requestId"].as_str().unwrap().is_empty());

    let annotated = decode_base64_rgb(json["annotatedImage"].as_str().unwrap()).unwrap();
    assert_eq!(annotated.dimensions(), (48, 32));
}

#[tokio::test]
async fn test_parse_defaults_to_auto_language() {
    let response = app()
        .oneshot(parse_request(serde_json::json!({ "image": screenshot_base64() })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    // Detector finds nothing, so auto falls back to English
    assert_eq!(json_body(response).await["effectiveLanguage"], "en");
}

#[tokio::test]
async fn test_parse_rejects_zero_threshold() {
    let response = app()
        .oneshot(parse_request(serde_json::json!({
            "image": screenshot_base64(),
            "boxThreshold": 0.0
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error_type"], "validation_error");
    assert_eq!(json["details"]["field"], "box_threshold");
    assert!(json["request_id"].is_string());
}

#[tokio::test]
async fn test_parse_rejects_missing_image() {
    let response = app()
        .oneshot(parse_request(serde_json::json!({ "language": "en" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["details"]["field"], "image");
}

#[tokio::test]
async fn test_parse_rejects_undecodable_image() {
    let response = app()
        .oneshot(parse_request(serde_json::json!({ "image": "%%%not-base64%%%" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error_type"], "invalid_image");
}

#[tokio::test]
async fn test_parse_rejects_unknown_language() {
    let response = app()
        .oneshot(parse_request(serde_json::json!({
            "image": screenshot_base64(),
            "language": "jp"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["details"]["field"], "language");
}

#[tokio::test]
async fn test_parse_malformed_json() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/v1/parse")
        .header("content-type", "application/json")
        .body(Body::from("{ not json"))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error_type"], "invalid_request");
}

#[tokio::test]
async fn test_labeling_failure_reports_stage() {
    let response = app_with(true, false)
        .oneshot(parse_request(serde_json::json!({ "image": screenshot_base64() })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert_eq!(json["error_type"], "processing_failed");
    assert_eq!(json["details"]["stage"], "labeling");
    assert!(json["message"]
        .as_str()
        .unwrap()
        .contains("icon detector unavailable"));
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let huge = "A".repeat(screen_parser::api::http_server::MAX_BODY_BYTES + 1024);
    let body = format!(r#"{{"image": "{}"}}"#, huge);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/v1/parse")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json_body(response).await["error_type"], "payload_too_large");
}
