// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Icon box de-duplication against other icons and OCR text

use crate::vision::geometry::BoundingBox;

/// Indices of the icon boxes that survive overlap removal
///
/// An icon box is dropped when its overlap score with a strictly smaller icon
/// box, or with any OCR box, exceeds `iou_threshold`. OCR boxes are never
/// removed. Surviving indices keep their input order.
pub fn remove_overlap(
    icon_boxes: &[BoundingBox],
    ocr_boxes: &[BoundingBox],
    iou_threshold: f32,
) -> Vec<usize> {
    icon_boxes
        .iter()
        .enumerate()
        .filter(|(i, icon)| {
            let covers_smaller_icon = icon_boxes.iter().enumerate().any(|(j, other)| {
                *i != j && other.area() < icon.area() && icon.overlap(other) > iou_threshold
            });
            let overlaps_text = ocr_boxes
                .iter()
                .any(|text| icon.overlap(text) > iou_threshold);
            !covers_smaller_icon && !overlaps_text
        })
        .map(|(i, _)| i)
        .collect()
}
