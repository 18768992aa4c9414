// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision models behind the screen parser
//!
//! This module provides:
//! - OCR (text detection + recognition) via PaddleOCR
//! - GUI icon detection via a YOLO export
//! - Icon captioning via Florence-2
//! - Set-of-marks labeling that merges and draws all elements
//!
//! Every model runs through ONNX Runtime, on CUDA when available.

pub mod detector;
pub mod florence;
pub mod geometry;
pub mod image_utils;
pub mod model_manager;
pub mod ocr;
pub mod session;
pub mod som;
pub mod text;

pub use geometry::BoundingBox;
pub use image_utils::{
    decode_base64_image, decode_base64_rgb, decode_image_bytes, detect_format, encode_png_base64,
    BgrImage, ImageError, ImageInfo,
};
pub use model_manager::{StartupError, VisionModelConfig, VisionModelInfo, VisionModelManager};
pub use session::{InferenceDevice, Precision, SessionOptions};
pub use text::{post_process_text, WhatlangDetector};
