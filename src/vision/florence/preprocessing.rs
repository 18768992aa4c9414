// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for Florence-2

use image::{imageops::FilterType, RgbImage};
use ndarray::Array4;

use crate::vision::ocr::preprocessing::to_nchw_tensor;

/// Input size of the Florence-2 vision encoder
pub const FLORENCE_INPUT_SIZE: u32 = 768;

/// Icon crops are normalized to this size before captioning
pub const ICON_CROP_SIZE: u32 = 64;

/// ImageNet normalization mean values
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet normalization std values
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Stretch an RGB image to the encoder size and normalize it
///
/// Florence-2's processor resizes without preserving aspect ratio, which
/// suits small icon crops.
pub fn preprocess_for_florence(image: &RgbImage) -> Array4<f32> {
    let resized = image::imageops::resize(
        image,
        FLORENCE_INPUT_SIZE,
        FLORENCE_INPUT_SIZE,
        FilterType::CatmullRom,
    );
    to_nchw_tensor(&resized, MEAN, STD)
}

/// Normalize an icon crop to `ICON_CROP_SIZE` square
pub fn normalize_icon_crop(crop: &RgbImage) -> RgbImage {
    image::imageops::resize(crop, ICON_CROP_SIZE, ICON_CROP_SIZE, FilterType::Triangle)
}
