// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for PaddleOCR and the icon detector
//!
//! Buffers are handled as opaque 3-channel images: the OCR models consume the
//! screenshot in BGR order, so the channel order of the input is preserved.

use image::{imageops::FilterType, Rgb, RgbImage};
use ndarray::Array4;

/// Target size for PaddleOCR detection model
pub const OCR_INPUT_SIZE: u32 = 960;

/// Recognition model input height
pub const REC_INPUT_HEIGHT: u32 = 48;

/// Maximum width for recognition model input
pub const REC_MAX_WIDTH: u32 = 320;

/// Detection normalization mean (ImageNet)
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Detection normalization std (ImageNet)
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Fill value used when padding detection input
pub const DETECTION_PAD: u8 = 0;

/// Scale and offsets applied by [`resize_with_padding`]
///
/// Maps detections from model input space back to the source image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessInfo {
    pub scale: f32,
    pub offset_x: u32,
    pub offset_y: u32,
    pub original_width: u32,
    pub original_height: u32,
}

impl PreprocessInfo {
    pub fn new(width: u32, height: u32, target_size: u32) -> Self {
        if width == 0 || height == 0 {
            return Self {
                scale: 1.0,
                offset_x: 0,
                offset_y: 0,
                original_width: width,
                original_height: height,
            };
        }

        let scale = (target_size as f32 / width as f32).min(target_size as f32 / height as f32);
        let new_w = ((width as f32 * scale).round() as u32).clamp(1, target_size);
        let new_h = ((height as f32 * scale).round() as u32).clamp(1, target_size);

        Self {
            scale,
            offset_x: (target_size - new_w) / 2,
            offset_y: (target_size - new_h) / 2,
            original_width: width,
            original_height: height,
        }
    }

    /// Map a coordinate from preprocessed space back to original image space
    pub fn map_to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let orig_x = (x - self.offset_x as f32) / self.scale;
        let orig_y = (y - self.offset_y as f32) / self.scale;
        (
            orig_x.clamp(0.0, self.original_width as f32),
            orig_y.clamp(0.0, self.original_height as f32),
        )
    }
}

/// Resize preserving aspect ratio, then center on a square canvas
pub fn resize_with_padding(image: &RgbImage, target_size: u32, fill: u8) -> (RgbImage, PreprocessInfo) {
    let info = PreprocessInfo::new(image.width(), image.height(), target_size);
    let mut output = RgbImage::from_pixel(target_size, target_size, Rgb([fill, fill, fill]));

    if image.width() == 0 || image.height() == 0 {
        return (output, info);
    }

    let new_w = ((image.width() as f32 * info.scale).round() as u32).clamp(1, target_size);
    let new_h = ((image.height() as f32 * info.scale).round() as u32).clamp(1, target_size);
    let resized = image::imageops::resize(image, new_w, new_h, FilterType::Triangle);

    image::imageops::replace(
        &mut output,
        &resized,
        info.offset_x as i64,
        info.offset_y as i64,
    );

    (output, info)
}

/// Convert an image into an NCHW tensor, `(pixel / 255 - mean) / std`
pub fn to_nchw_tensor(image: &RgbImage, mean: [f32; 3], std: [f32; 3]) -> Array4<f32> {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let mut tensor = Array4::zeros((1, 3, height, width));

    for (x, y, pixel) in image.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (pixel[c] as f32 / 255.0 - mean[c]) / std[c];
        }
    }

    tensor
}

/// Letterbox and normalize a screenshot for text detection
pub fn preprocess_for_detection(image: &RgbImage) -> (Array4<f32>, PreprocessInfo) {
    let (padded, info) = resize_with_padding(image, OCR_INPUT_SIZE, DETECTION_PAD);
    (to_nchw_tensor(&padded, MEAN, STD), info)
}

/// Resize a cropped text line to the recognition height
///
/// Width follows the aspect ratio, clamped to `[4, REC_MAX_WIDTH]`.
/// Pixels are normalized to `[-1, 1]`.
pub fn preprocess_for_recognition(crop: &RgbImage) -> Array4<f32> {
    let (orig_w, orig_h) = crop.dimensions();
    let scale = REC_INPUT_HEIGHT as f32 / orig_h.max(1) as f32;
    let new_width = ((orig_w as f32 * scale).round() as u32).clamp(4, REC_MAX_WIDTH);

    let resized = image::imageops::resize(crop, new_width, REC_INPUT_HEIGHT, FilterType::Triangle);
    to_nchw_tensor(&resized, [0.5; 3], [0.5; 3])
}
