// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection + captioning labeler

use anyhow::{Context, Result};
use image::imageops;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::annotate::BoxAnnotator;
use super::overlap::remove_overlap;
use super::{ElementDetector, IconCaptioner};
use crate::pipeline::{ElementKind, ElementLabeler, LabelCoordinate, LabelRequest, LabeledScreen};
use crate::vision::geometry::BoundingBox;
use crate::vision::image_utils::encode_png_base64;

pub const DEFAULT_CAPTION_PROMPT: &str = "<CAPTION>";

/// Set-of-marks labeler over an icon detector and an icon captioner
///
/// Text elements keep the OCR order and take IDs `0..n`; surviving icons
/// follow with IDs `n..`.
#[derive(Clone)]
pub struct SomLabeler {
    detector: Arc<dyn ElementDetector>,
    captioner: Arc<dyn IconCaptioner>,
    annotator: BoxAnnotator,
    caption_prompt: String,
}

impl SomLabeler {
    pub fn new(
        detector: Arc<dyn ElementDetector>,
        captioner: Arc<dyn IconCaptioner>,
        annotator: BoxAnnotator,
    ) -> Self {
        Self {
            detector,
            captioner,
            annotator,
            caption_prompt: DEFAULT_CAPTION_PROMPT.to_string(),
        }
    }

    pub fn with_caption_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.caption_prompt = prompt.into();
        self
    }

    pub fn caption_prompt(&self) -> &str {
        &self.caption_prompt
    }
}

impl ElementLabeler for SomLabeler {
    fn label(&self, request: &LabelRequest<'_>) -> Result<LabeledScreen> {
        let start = Instant::now();

        if request.ocr_texts.len() != request.ocr_boxes.len() {
            anyhow::bail!(
                "{} OCR texts for {} OCR boxes",
                request.ocr_texts.len(),
                request.ocr_boxes.len()
            );
        }

        let rgb = request.image.to_rgb();
        let (width, height) = rgb.dimensions();
        let (w, h) = (width as f32, height as f32);

        let detections = self
            .detector
            .detect(&rgb, request.box_threshold)
            .context("Icon detection failed")?;

        let ocr_ratio: Vec<BoundingBox> = request
            .ocr_boxes
            .iter()
            .map(|b| b.clamp(w, h).to_ratio(width, height))
            .collect();
        let icon_pixels: Vec<BoundingBox> = detections
            .iter()
            .map(|d| d.bbox.clamp(w, h))
            .filter(BoundingBox::is_valid)
            .collect();
        let icon_ratio: Vec<BoundingBox> = icon_pixels
            .iter()
            .map(|b| b.to_ratio(width, height))
            .collect();

        let kept = remove_overlap(&icon_ratio, &ocr_ratio, request.iou_threshold);
        debug!(
            detected = detections.len(),
            kept = kept.len(),
            "Icon boxes after overlap removal"
        );

        let mut parsed_elements = Vec::with_capacity(ocr_ratio.len() + kept.len());
        let mut label_coordinates = Vec::with_capacity(ocr_ratio.len() + kept.len());
        let mut drawn = Vec::with_capacity(ocr_ratio.len() + kept.len());

        for (id, (text, ratio)) in request.ocr_texts.iter().zip(&ocr_ratio).enumerate() {
            parsed_elements.push(format!("Text Box ID {}: {}", id, text));
            label_coordinates.push(LabelCoordinate::from_ratio_box(id, ElementKind::Text, ratio));
            drawn.push((id, request.ocr_boxes[id]));
        }

        for (offset, &index) in kept.iter().enumerate() {
            if request.cancel.is_cancelled() {
                anyhow::bail!("Labeling cancelled before captioning icon {}", index);
            }

            let id = ocr_ratio.len() + offset;
            let pixels = icon_pixels[index];

            let x = (pixels.x1.round() as u32).min(width.saturating_sub(1));
            let y = (pixels.y1.round() as u32).min(height.saturating_sub(1));
            let crop_w = (pixels.x2.round() as u32).saturating_sub(x).max(1);
            let crop_h = (pixels.y2.round() as u32).saturating_sub(y).max(1);
            let crop = imageops::crop_imm(&rgb, x, y, crop_w, crop_h).to_image();

            let caption = self
                .captioner
                .caption(&crop, &self.caption_prompt)
                .with_context(|| format!("Captioning failed for icon box {}", id))?;

            parsed_elements.push(format!("Icon Box ID {}: {}", id, caption.trim()));
            label_coordinates.push(LabelCoordinate::from_ratio_box(
                id,
                ElementKind::Icon,
                &icon_ratio[index],
            ));
            drawn.push((id, pixels));
        }

        let mut annotated = rgb;
        self.annotator
            .annotate(&mut annotated, &drawn, &request.draw_config);
        let annotated_image_base64 =
            encode_png_base64(&annotated).context("Failed to encode annotated image")?;

        info!(
            text_elements = ocr_ratio.len(),
            icon_elements = kept.len(),
            label_ms = start.elapsed().as_millis() as u64,
            "✅ Elements labeled"
        );

        Ok(LabeledScreen {
            annotated_image_base64,
            parsed_elements,
            label_coordinates,
        })
    }
}
