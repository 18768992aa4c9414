// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLO output decoding and non-maximum suppression

use anyhow::Result;
use ndarray::ArrayViewD;

use crate::vision::geometry::BoundingBox;
use crate::vision::ocr::preprocessing::PreprocessInfo;

/// A detected GUI element in source pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f32,
}

/// Greedy class-agnostic NMS, highest confidence first
pub fn nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        if keep
            .iter()
            .all(|kept| kept.bbox.iou(&candidate.bbox) <= iou_threshold)
        {
            keep.push(candidate);
        }
    }
    keep
}

/// Decode a `[1, 4 + classes, N]` YOLO output
///
/// Each column holds `cx, cy, w, h` in model input pixels followed by class
/// scores; the best class score is the confidence. Columns at or below
/// `confidence_threshold` are skipped, the rest are mapped back through the
/// letterbox and suppressed with `nms`.
pub fn postprocess_output(
    output: ArrayViewD<f32>,
    confidence_threshold: f32,
    iou_threshold: f32,
    letterbox: &PreprocessInfo,
) -> Result<Vec<Detection>> {
    let shape = output.shape();
    if shape.len() != 3 || shape[1] < 5 {
        anyhow::bail!("Expected [1, 4 + classes, N] output, got {:?}", shape);
    }
    let (channels, num_boxes) = (shape[1], shape[2]);

    let mut detections = Vec::new();
    for i in 0..num_boxes {
        let confidence = (4..channels)
            .map(|c| output[[0, c, i]])
            .fold(f32::NEG_INFINITY, f32::max);
        if confidence <= confidence_threshold {
            continue;
        }

        let (cx, cy) = (output[[0, 0, i]], output[[0, 1, i]]);
        let (w, h) = (output[[0, 2, i]], output[[0, 3, i]]);

        let (x1, y1) = letterbox.map_to_original(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.map_to_original(cx + w / 2.0, cy + h / 2.0);
        let bbox = BoundingBox::new(x1, y1, x2, y2);
        if bbox.is_valid() {
            detections.push(Detection { bbox, confidence });
        }
    }

    Ok(nms(detections, iou_threshold))
}
