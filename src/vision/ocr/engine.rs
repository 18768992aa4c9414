// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PaddleOCR engine: detection followed by per-line recognition

use anyhow::{Context, Result};
use image::RgbImage;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use super::detection::OcrDetectionModel;
use super::recognition::{OcrRecognitionModel, RecognizedText};
use crate::pipeline::{OcrEngine, OcrOutput};
use crate::vision::geometry::BoundingBox;
use crate::vision::image_utils::BgrImage;
use crate::vision::session::{resolve_model_variant, Precision, SessionOptions};

/// Minimum recognition confidence for a line to be kept
pub const DEFAULT_TEXT_THRESHOLD: f32 = 0.9;

pub const DETECTION_MODEL_FILE: &str = "det_model.onnx";
pub const RECOGNITION_MODEL_FILE: &str = "rec_model.onnx";
pub const DICTIONARY_FILE: &str = "ppocr_keys.txt";

/// Margin added around each detected box before cropping, in pixels
const CROP_MARGIN: f32 = 2.0;

/// OCR engine backed by the PaddleOCR ONNX models
///
/// Operates on the BGR buffer as-is. Lines below the text threshold or
/// with empty text are dropped together with their boxes. Paragraph
/// merging is not performed.
#[derive(Debug, Clone)]
pub struct PaddleOcrEngine {
    detector: OcrDetectionModel,
    recognizer: OcrRecognitionModel,
    text_threshold: f32,
    precision: Precision,
}

impl PaddleOcrEngine {
    /// Load `det_model.onnx`, `rec_model.onnx` and `ppocr_keys.txt` from a directory
    pub fn load(model_dir: &Path, options: &SessionOptions) -> Result<Self> {
        if !model_dir.is_dir() {
            anyhow::bail!("OCR model directory not found: {}", model_dir.display());
        }

        let (det_path, det_precision) =
            resolve_model_variant(&model_dir.join(DETECTION_MODEL_FILE), options.device);
        let (rec_path, rec_precision) =
            resolve_model_variant(&model_dir.join(RECOGNITION_MODEL_FILE), options.device);

        let detector = OcrDetectionModel::new(&det_path, options)?;
        let recognizer =
            OcrRecognitionModel::new(&rec_path, &model_dir.join(DICTIONARY_FILE), options)?;

        let precision = Precision::common(&[det_precision, rec_precision]);

        info!(
            "✅ PaddleOCR engine ready from {} ({:?})",
            model_dir.display(),
            precision
        );

        Ok(Self {
            detector,
            recognizer,
            text_threshold: DEFAULT_TEXT_THRESHOLD,
            precision,
        })
    }

    pub fn text_threshold(&self) -> f32 {
        self.text_threshold
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }
}

/// Keep lines that pass the threshold, pairing each text with its box
pub fn filter_recognized(
    lines: Vec<(BoundingBox, RecognizedText)>,
    text_threshold: f32,
) -> Vec<(String, BoundingBox)> {
    lines
        .into_iter()
        .filter(|(_, line)| !line.is_empty() && line.confidence >= text_threshold)
        .map(|(bbox, line)| (line.text, bbox))
        .collect()
}

/// Crop a box (plus margin) out of an image, `None` when it is degenerate
pub fn crop_region(image: &RgbImage, bbox: &BoundingBox) -> Option<RgbImage> {
    let padded = BoundingBox::new(
        bbox.x1 - CROP_MARGIN,
        bbox.y1 - CROP_MARGIN,
        bbox.x2 + CROP_MARGIN,
        bbox.y2 + CROP_MARGIN,
    )
    .clamp(image.width() as f32, image.height() as f32);

    let x = padded.x1.floor() as u32;
    let y = padded.y1.floor() as u32;
    let width = (padded.x2.ceil() as u32).saturating_sub(x);
    let height = (padded.y2.ceil() as u32).saturating_sub(y);
    if width == 0 || height == 0 {
        return None;
    }

    Some(image::imageops::crop_imm(image, x, y, width, height).to_image())
}

impl OcrEngine for PaddleOcrEngine {
    fn recognize(&self, image: &BgrImage) -> Result<OcrOutput> {
        let start = Instant::now();

        // Channel order stays BGR; the buffer type is only a container here
        let buffer = RgbImage::from_raw(image.width(), image.height(), image.as_raw().to_vec())
            .context("BGR buffer does not match image dimensions")?;

        let boxes = self.detector.detect(&buffer)?;

        let mut lines = Vec::with_capacity(boxes.len());
        for text_box in boxes {
            let Some(crop) = crop_region(&buffer, &text_box.bbox) else {
                continue;
            };
            let recognized = self
                .recognizer
                .recognize(&crop)
                .with_context(|| format!("Recognition failed for box {:?}", text_box.bbox))?;
            lines.push((text_box.bbox, recognized));
        }

        let detected = lines.len();
        let regions = filter_recognized(lines, self.text_threshold);

        debug!(
            detected,
            kept = regions.len(),
            ocr_ms = start.elapsed().as_millis() as u64,
            "OCR lines recognized"
        );

        Ok(OcrOutput::from_regions(regions))
    }
}
