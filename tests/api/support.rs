// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Router fixtures backed by in-process fakes

use anyhow::Result;
use axum::body::Body;
use axum::http::Response;
use axum::Router;
use image::{Rgb, RgbImage};
use screen_parser::api::{create_app, AppState};
use screen_parser::config::DrawBoxConfig;
use screen_parser::pipeline::{
    ElementLabeler, LabelRequest, LabeledScreen, LanguageDetector, OcrEngine, OcrOutput,
    ScreenParsingPipeline,
};
use screen_parser::vision::{
    encode_png_base64, BgrImage, BoundingBox, InferenceDevice, Precision, VisionModelInfo,
};
use std::sync::Arc;

/// OCR that always reads one "OK" label
pub struct FixedOcr;

impl OcrEngine for FixedOcr {
    fn recognize(&self, _image: &BgrImage) -> Result<OcrOutput> {
        Ok(OcrOutput::from_regions(vec![(
            "OK".to_string(),
            BoundingBox::new(4.0, 4.0, 20.0, 12.0),
        )]))
    }
}

pub struct NoLanguage;

impl LanguageDetector for NoLanguage {
    fn detect(&self, _text: &str) -> Option<String> {
        None
    }
}

/// Echoes OCR texts as elements; fails when `fail` is set
pub struct EchoLabeler {
    pub fail: bool,
}

impl ElementLabeler for EchoLabeler {
    fn label(&self, request: &LabelRequest<'_>) -> Result<LabeledScreen> {
        if self.fail {
            anyhow::bail!("icon detector unavailable");
        }
        Ok(LabeledScreen {
            annotated_image_base64: encode_png_base64(&request.image.to_rgb())?,
            parsed_elements: request
                .ocr_texts
                .iter()
                .enumerate()
                .map(|(i, t)| format!("Text Box ID {}: {}", i, t))
                .collect(),
            label_coordinates: Vec::new(),
        })
    }
}

pub fn models() -> Vec<VisionModelInfo> {
    vec![VisionModelInfo {
        name: "paddleocr".to_string(),
        model_type: "ocr".to_string(),
        device: InferenceDevice::Cpu,
        precision: Precision::Full,
    }]
}

pub fn app_with(fail_labeling: bool, share: bool) -> Router {
    let pipeline = ScreenParsingPipeline::new(
        Arc::new(FixedOcr),
        Arc::new(NoLanguage),
        Arc::new(EchoLabeler {
            fail: fail_labeling,
        }),
        DrawBoxConfig::PC,
    );
    create_app(AppState::new(pipeline, models()), share)
}

pub fn app() -> Router {
    app_with(false, false)
}

pub fn screenshot() -> RgbImage {
    RgbImage::from_pixel(48, 32, Rgb([200, 200, 200]))
}

pub fn screenshot_png() -> Vec<u8> {
    let mut bytes = std::io::Cursor::new(Vec::new());
    screenshot()
        .write_to(&mut bytes, image::ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}

pub fn screenshot_base64() -> String {
    encode_png_base64(&screenshot()).unwrap()
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub const BOUNDARY: &str = "screen-parser-test-boundary";

/// Build a multipart body from text fields and an optional image part
pub fn multipart_body(fields: &[(&str, &str)], image: Option<&[u8]>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(bytes) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"screen.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}
