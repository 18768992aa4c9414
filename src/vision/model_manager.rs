// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Startup loading of the OCR, icon detection and icon caption models

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::vision::detector::IconDetector;
use crate::vision::florence::FlorenceCaptioner;
use crate::vision::ocr::PaddleOcrEngine;
use crate::vision::session::{InferenceDevice, Precision, SessionOptions};
use crate::vision::som::labeler::DEFAULT_CAPTION_PROMPT;

/// Model locations and session settings
#[derive(Debug, Clone)]
pub struct VisionModelConfig {
    /// YOLO icon detection model (ONNX file)
    pub icon_detect_model: PathBuf,
    /// Florence-2 icon caption model directory
    pub caption_model_dir: PathBuf,
    /// PaddleOCR model directory
    pub ocr_model_dir: PathBuf,
    pub caption_prompt: String,
    pub intra_threads: usize,
    pub force_cpu: bool,
}

impl Default for VisionModelConfig {
    fn default() -> Self {
        Self {
            icon_detect_model: PathBuf::from("weights/icon_detect/model.onnx"),
            caption_model_dir: PathBuf::from("weights/icon_caption_florence"),
            ocr_model_dir: PathBuf::from("weights/ocr"),
            caption_prompt: DEFAULT_CAPTION_PROMPT.to_string(),
            intra_threads: 4,
            force_cpu: false,
        }
    }
}

/// A model that failed to load at startup
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to load OCR models from {path}")]
    Ocr {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to load icon detection model {path}")]
    IconDetector {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to load icon caption model from {path}")]
    Captioner {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

/// Information about a loaded vision model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionModelInfo {
    pub name: String,
    /// ocr, detection or caption
    pub model_type: String,
    pub device: InferenceDevice,
    pub precision: Precision,
}

/// The three models behind the screen parser, loaded once at startup
///
/// Unlike optional feature models, every model here is required: loading
/// fails as a whole if any one of them is missing.
#[derive(Debug, Clone)]
pub struct VisionModelManager {
    ocr: Arc<PaddleOcrEngine>,
    detector: Arc<IconDetector>,
    captioner: Arc<FlorenceCaptioner>,
    device: InferenceDevice,
}

impl VisionModelManager {
    /// Load all models; blocking, call from a blocking context
    pub fn load(config: &VisionModelConfig) -> Result<Self, StartupError> {
        let device = InferenceDevice::detect(config.force_cpu);
        let options = SessionOptions {
            device,
            intra_threads: config.intra_threads,
        };

        let ocr = PaddleOcrEngine::load(&config.ocr_model_dir, &options).map_err(|source| {
            StartupError::Ocr {
                path: config.ocr_model_dir.clone(),
                source,
            }
        })?;

        let detector = IconDetector::load(&config.icon_detect_model, &options).map_err(|source| {
            StartupError::IconDetector {
                path: config.icon_detect_model.clone(),
                source,
            }
        })?;

        let captioner =
            FlorenceCaptioner::load(&config.caption_model_dir, &options).map_err(|source| {
                StartupError::Captioner {
                    path: config.caption_model_dir.clone(),
                    source,
                }
            })?;

        info!("✅ All vision models loaded on {}", device);

        Ok(Self {
            ocr: Arc::new(ocr),
            detector: Arc::new(detector),
            captioner: Arc::new(captioner),
            device,
        })
    }

    pub fn ocr(&self) -> Arc<PaddleOcrEngine> {
        self.ocr.clone()
    }

    pub fn detector(&self) -> Arc<IconDetector> {
        self.detector.clone()
    }

    pub fn captioner(&self) -> Arc<FlorenceCaptioner> {
        self.captioner.clone()
    }

    pub fn device(&self) -> InferenceDevice {
        self.device
    }

    pub fn list_models(&self) -> Vec<VisionModelInfo> {
        vec![
            VisionModelInfo {
                name: "paddleocr".to_string(),
                model_type: "ocr".to_string(),
                device: self.device,
                precision: self.ocr.precision(),
            },
            VisionModelInfo {
                name: "icon-detect".to_string(),
                model_type: "detection".to_string(),
                device: self.device,
                precision: self.detector.precision(),
            },
            VisionModelInfo {
                name: "florence-2".to_string(),
                model_type: "caption".to_string(),
                device: self.device,
                precision: self.captioner.precision(),
            },
        ]
    }
}
