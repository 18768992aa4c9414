// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! End to end parsing with the real ONNX models
//!
//! Needs the weights under `/workspace/models/screen-parser`; run with
//! `cargo test --test api_tests -- --ignored`.

use super::support::*;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use screen_parser::api::{create_app, AppState};
use screen_parser::config::DrawBoxConfig;
use screen_parser::pipeline::ScreenParsingPipeline;
use screen_parser::vision::som::{BoxAnnotator, LabelFont, SomLabeler};
use screen_parser::vision::{VisionModelConfig, VisionModelManager, WhatlangDetector};
use std::path::PathBuf;
use std::sync::Arc;
use tower::util::ServiceExt;

const WEIGHTS_DIR: &str = "/workspace/models/screen-parser";

fn real_app() -> axum::Router {
    let weights = PathBuf::from(WEIGHTS_DIR);
    let config = VisionModelConfig {
        icon_detect_model: weights.join("icon_detect/model.onnx"),
        caption_model_dir: weights.join("icon_caption_florence"),
        ocr_model_dir: weights.join("ocr"),
        force_cpu: true,
        ..VisionModelConfig::default()
    };
    let models = VisionModelManager::load(&config).expect("models should load");

    let labeler = SomLabeler::new(
        models.detector(),
        models.captioner(),
        BoxAnnotator::new(LabelFont::discover(None)),
    );
    let pipeline = ScreenParsingPipeline::new(
        models.ocr(),
        Arc::new(WhatlangDetector::new()),
        Arc::new(labeler),
        DrawBoxConfig::PC,
    );
    create_app(AppState::new(pipeline, models.list_models()), false)
}

#[tokio::test]
#[ignore = "requires model weights"]
async fn test_parse_blank_screen_with_real_models() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/v1/parse")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({ "image": screenshot_base64() }).to_string(),
        ))
        .unwrap();

    let response = real_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["width"], 48);
    assert_eq!(json["height"], 32);
    let lines = json["parsedText"].as_str().unwrap().lines().count();
    assert_eq!(lines, json["parsedElements"].as_array().unwrap().len());
}
