// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Health, model listing, the upload form and CORS

use super::support::*;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use tower::util::ServiceExt;

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let response = app().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], screen_parser::version::VERSION_NUMBER);
    assert_eq!(json["models"][0]["name"], "paddleocr");
}

#[tokio::test]
async fn test_models() {
    let response = app().oneshot(get("/v1/models")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    let model = &json["models"][0];
    assert_eq!(model["modelType"], "ocr");
    assert_eq!(model["device"], "cpu");
    assert_eq!(model["precision"], "full");
}

#[tokio::test]
async fn test_index_form() {
    let response = app().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("Box Threshold"));
    assert!(html.contains("IOU Threshold"));
    assert!(html.contains("/v1/parse/upload"));
}

#[tokio::test]
async fn test_unknown_route() {
    let response = app().oneshot(get("/v1/ocr")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error_type"], "not_found");
}

#[tokio::test]
async fn test_parse_requires_post() {
    let response = app().oneshot(get("/v1/parse")).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

fn preflight() -> Request<Body> {
    Request::builder()
        .method(Method::OPTIONS)
        .uri("/v1/parse")
        .header(header::ORIGIN, "https://example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_cors_only_when_shared() {
    let shared = app_with(false, true).oneshot(preflight()).await.unwrap();
    assert_eq!(
        shared.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );

    let private = app().oneshot(get("/health")).await.unwrap();
    assert!(private
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
