// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Shared fakes for pipeline integration tests

use anyhow::Result;
use image::{Rgb, RgbImage};
use mockall::mock;
use screen_parser::pipeline::{
    ElementLabeler, LabelRequest, LabeledScreen, LanguageDetector, OcrEngine, OcrOutput,
};
use screen_parser::vision::detector::Detection;
use screen_parser::vision::som::{ElementDetector, IconCaptioner};
use screen_parser::vision::{encode_png_base64, BgrImage, BoundingBox};
use std::sync::Mutex;
use std::time::Duration;

mock! {
    pub Ocr {}
    impl OcrEngine for Ocr {
        fn recognize(&self, image: &BgrImage) -> Result<OcrOutput>;
    }
}

mock! {
    pub Language {}
    impl LanguageDetector for Language {
        fn detect(&self, text: &str) -> Option<String>;
    }
}

mock! {
    pub Icons {}
    impl ElementDetector for Icons {
        fn detect(&self, image: &RgbImage, box_threshold: f32) -> Result<Vec<Detection>>;
    }
}

mock! {
    pub Captioner {}
    impl IconCaptioner for Captioner {
        fn caption(&self, crop: &RgbImage, prompt: &str) -> Result<String>;
    }
}

/// What a labeler saw on one call
#[derive(Debug, Clone, PartialEq)]
pub struct LabelCall {
    pub box_threshold: f32,
    pub iou_threshold: f32,
    pub ocr_texts: Vec<String>,
    pub ocr_boxes: Vec<BoundingBox>,
    pub image_size: (u32, u32),
    /// Channel bytes of the top-left pixel as handed to the labeler
    pub first_pixel: [u8; 3],
}

/// Labeler that echoes the OCR texts as elements and records every call
#[derive(Default)]
pub struct RecordingLabeler {
    pub calls: Mutex<Vec<LabelCall>>,
}

impl RecordingLabeler {
    pub fn calls(&self) -> Vec<LabelCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl ElementLabeler for RecordingLabeler {
    fn label(&self, request: &LabelRequest<'_>) -> Result<LabeledScreen> {
        self.calls.lock().unwrap().push(LabelCall {
            box_threshold: request.box_threshold,
            iou_threshold: request.iou_threshold,
            ocr_texts: request.ocr_texts.to_vec(),
            ocr_boxes: request.ocr_boxes.to_vec(),
            image_size: request.image.dimensions(),
            first_pixel: first_pixel(request.image),
        });

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

/// Labeler that spins until the request is cancelled
pub struct StallingLabeler;

impl ElementLabeler for StallingLabeler {
    fn label(&self, request: &LabelRequest<'_>) -> Result<LabeledScreen> {
        while !request.cancel.is_cancelled() {
            std::thread::sleep(Duration::from_millis(5));
        }
        anyhow::bail!("stopped by cancellation")
    }
}

/// Light grey screen with a dark "OK" button in the middle
pub fn ok_button_screen() -> (RgbImage, BoundingBox) {
    let mut image = RgbImage::from_pixel(320, 240, Rgb([235, 235, 235]));
    let button = BoundingBox::new(120.0, 100.0, 200.0, 140.0);
    for y in 100..140 {
        for x in 120..200 {
            image.put_pixel(x, y, Rgb([40, 90, 200]));
        }
    }
    (image, button)
}

pub fn first_pixel(image: &BgrImage) -> [u8; 3] {
    let raw = image.as_raw();
    [raw[0], raw[1], raw[2]]
}

pub fn red_screen() -> RgbImage {
    RgbImage::from_pixel(16, 8, Rgb([255, 0, 0]))
}

/// Square of pseudo-random pixels; its PNG is about as large as the raw buffer
pub fn noisy_screen(size: u32) -> RgbImage {
    let mut state: u32 = 0x2545_F491;
    RgbImage::from_fn(size, size, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [r, g, b, _] = state.to_le_bytes();
        Rgb([r, g, b])
    })
}

pub fn blank_screen() -> RgbImage {
    RgbImage::from_pixel(64, 48, Rgb([255, 255, 255]))
}
