// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PaddleOCR text detection model
//!
//! The model outputs a per-pixel text probability map. Connected regions
//! above the binarization threshold become text boxes.

use anyhow::{Context, Result};
use image::RgbImage;
use ndarray::{ArrayView2, Axis, Ix2};
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::preprocessing::preprocess_for_detection;
use crate::vision::geometry::BoundingBox;
use crate::vision::session::{build_session, first_input_name, SessionOptions};

/// Pixel probability above which a pixel counts as text
pub const BINARIZE_THRESHOLD: f32 = 0.3;

/// Minimum mean probability of a region
pub const BOX_THRESHOLD: f32 = 0.6;

/// Regions with fewer pixels are discarded
pub const MIN_REGION_PIXELS: usize = 10;

/// Box expansion ratio (DB "unclip")
pub const UNCLIP_RATIO: f32 = 1.5;

/// A detected text region in probability-map coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct TextBox {
    pub bbox: BoundingBox,
    /// Mean probability inside the region
    pub confidence: f32,
}

/// Find text regions in a probability map
///
/// 4-connected components above `BINARIZE_THRESHOLD`, filtered by size and
/// mean score, expanded by `UNCLIP_RATIO` and clamped to the map. Sorted
/// top-to-bottom, then left-to-right.
pub fn boxes_from_probability_map(map: ArrayView2<f32>) -> Vec<TextBox> {
    let (height, width) = map.dim();
    let mut visited = vec![false; width * height];
    let mut boxes = Vec::new();

    for y in 0..height {
        for x in 0..width {
            if visited[y * width + x] || map[[y, x]] < BINARIZE_THRESHOLD {
                continue;
            }

            let mut stack = vec![(x, y)];
            visited[y * width + x] = true;
            let (mut min_x, mut max_x, mut min_y, mut max_y) = (x, x, y, y);
            let mut count = 0usize;
            let mut score = 0.0f32;

            while let Some((cx, cy)) = stack.pop() {
                count += 1;
                score += map[[cy, cx]];
                min_x = min_x.min(cx);
                max_x = max_x.max(cx);
                min_y = min_y.min(cy);
                max_y = max_y.max(cy);

                let neighbors = [
                    (cx.wrapping_sub(1), cy),
                    (cx + 1, cy),
                    (cx, cy.wrapping_sub(1)),
                    (cx, cy + 1),
                ];
                for (nx, ny) in neighbors {
                    if nx < width
                        && ny < height
                        && !visited[ny * width + nx]
                        && map[[ny, nx]] >= BINARIZE_THRESHOLD
                    {
                        visited[ny * width + nx] = true;
                        stack.push((nx, ny));
                    }
                }
            }

            let confidence = score / count as f32;
            if count < MIN_REGION_PIXELS || confidence < BOX_THRESHOLD {
                continue;
            }

            let raw = BoundingBox::new(
                min_x as f32,
                min_y as f32,
                (max_x + 1) as f32,
                (max_y + 1) as f32,
            );
            boxes.push((
                raw,
                TextBox {
                    bbox: unclip(&raw).clamp(width as f32, height as f32),
                    confidence,
                },
            ));
        }
    }

    // Reading order on the unexpanded boxes
    boxes.sort_by(|(a, _), (b, _)| a.y1.total_cmp(&b.y1).then(a.x1.total_cmp(&b.x1)));
    boxes.into_iter().map(|(_, text_box)| text_box).collect()
}

/// Grow a box by `area * UNCLIP_RATIO / perimeter` on every side
fn unclip(bbox: &BoundingBox) -> BoundingBox {
    let perimeter = 2.0 * (bbox.width() + bbox.height());
    if perimeter <= 0.0 {
        return *bbox;
    }
    let distance = bbox.area() * UNCLIP_RATIO / perimeter;
    BoundingBox::new(
        bbox.x1 - distance,
        bbox.y1 - distance,
        bbox.x2 + distance,
        bbox.y2 + distance,
    )
}

/// PaddleOCR text detection model
#[derive(Clone)]
pub struct OcrDetectionModel {
    session: Arc<Mutex<Session>>,
    input_name: String,
}

impl std::fmt::Debug for OcrDetectionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrDetectionModel")
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl OcrDetectionModel {
    /// Load the detection model (det_model.onnx)
    pub fn new(model_path: &Path, options: &SessionOptions) -> Result<Self> {
        if !model_path.exists() {
            anyhow::bail!("OCR detection model not found: {}", model_path.display());
        }

        info!("Loading OCR detection model from {}", model_path.display());
        let session = build_session(model_path, options)
            .context("Failed to load OCR detection model")?;
        let input_name = first_input_name(&session, "x");

        info!("✅ OCR detection model loaded on {}", options.device);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
        })
    }

    /// Detect text boxes, returned in source image pixel coordinates
    pub fn detect(&self, image: &RgbImage) -> Result<Vec<TextBox>> {
        let (input, info) = preprocess_for_detection(image);

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("OCR detection session lock poisoned"))?;

        let input_value = Value::from_array(input).context("Failed to create input tensor")?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .context("Detection inference failed")?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        // [1, 1, H, W] or [1, H, W]
        let mut map = output.view();
        while map.ndim() > 2 {
            map = map.index_axis_move(Axis(0), 0);
        }
        let map = map
            .into_dimensionality::<Ix2>()
            .context("Unexpected detection output shape")?;

        let (map_h, map_w) = map.dim();
        let input_side = super::preprocessing::OCR_INPUT_SIZE as f32;
        let (scale_x, scale_y) = (input_side / map_w as f32, input_side / map_h as f32);

        let boxes: Vec<TextBox> = boxes_from_probability_map(map)
            .into_iter()
            .filter_map(|text_box| {
                let b = text_box.bbox;
                let (x1, y1) = info.map_to_original(b.x1 * scale_x, b.y1 * scale_y);
                let (x2, y2) = info.map_to_original(b.x2 * scale_x, b.y2 * scale_y);
                let bbox = BoundingBox::new(x1, y1, x2, y2);
                bbox.is_valid().then_some(TextBox {
                    bbox,
                    confidence: text_box.confidence,
                })
            })
            .collect();

        debug!("Detected {} text regions", boxes.len());
        Ok(boxes)
    }
}
