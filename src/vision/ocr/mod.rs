// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PaddleOCR integration for text extraction from screenshots
//!
//! Components:
//! - `detection` - Text region detection (DB probability map)
//! - `recognition` - CTC text recognition of detected lines
//! - `preprocessing` - Letterboxing and tensor conversion
//! - `engine` - Combined OCR engine used by the pipeline

pub mod detection;
pub mod engine;
pub mod preprocessing;
pub mod recognition;

pub use detection::{OcrDetectionModel, TextBox};
pub use engine::{PaddleOcrEngine, DEFAULT_TEXT_THRESHOLD};
pub use recognition::{OcrRecognitionModel, RecognizedText};
