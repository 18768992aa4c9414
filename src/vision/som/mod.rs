// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Set-of-marks labeling
//!
//! Combines OCR boxes with detected icon boxes, captions the icons and draws
//! every element with its numeric ID onto the screenshot.

pub mod annotate;
pub mod labeler;
pub mod overlap;

pub use annotate::{BoxAnnotator, LabelFont};
pub use labeler::SomLabeler;
pub use overlap::remove_overlap;

use anyhow::Result;
use image::RgbImage;

use crate::vision::detector::Detection;

/// Finds interactable GUI elements in a screenshot
#[cfg_attr(test, mockall::automock)]
pub trait ElementDetector: Send + Sync {
    /// Detections above `box_threshold`, in image pixel coordinates
    fn detect(&self, image: &RgbImage, box_threshold: f32) -> Result<Vec<Detection>>;
}

/// Describes a cropped icon in a few words
#[cfg_attr(test, mockall::automock)]
pub trait IconCaptioner: Send + Sync {
    fn caption(&self, crop: &RgbImage, prompt: &str) -> Result<String>;
}
