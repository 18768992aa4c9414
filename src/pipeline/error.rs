// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Pipeline step a failure or cancellation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validation,
    ColorConversion,
    Ocr,
    LanguageDetection,
    TextNormalization,
    Labeling,
    ImageDecode,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validation => "validation",
            Stage::ColorConversion => "color_conversion",
            Stage::Ocr => "ocr",
            Stage::LanguageDetection => "language_detection",
            Stage::TextNormalization => "text_normalization",
            Stage::Labeling => "labeling",
            Stage::ImageDecode => "image_decode",
        };
        f.write_str(name)
    }
}

/// Failure of a single parse request
///
/// Every variant aborts the request; nothing partial is returned.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid argument `{field}`: {message}")]
    InvalidArgument { field: &'static str, message: String },

    #[error("{stage} stage failed")]
    Stage {
        stage: Stage,
        #[source]
        cause: anyhow::Error,
    },

    #[error("request cancelled before {stage} stage completed")]
    Cancelled { stage: Stage },

    #[error("pipeline task failed: {0}")]
    TaskFailed(String),
}

impl PipelineError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        PipelineError::InvalidArgument {
            field,
            message: message.into(),
        }
    }

    pub fn stage(stage: Stage, cause: impl Into<anyhow::Error>) -> Self {
        PipelineError::Stage {
            stage,
            cause: cause.into(),
        }
    }

    /// Stage the error is attributed to, if any
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            PipelineError::InvalidArgument { .. } => Some(Stage::Validation),
            PipelineError::Stage { stage, .. } | PipelineError::Cancelled { stage } => {
                Some(*stage)
            }
            PipelineError::TaskFailed(_) => None,
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, PipelineError::InvalidArgument { .. })
    }

    /// OCR backend failure
    pub fn is_ocr_error(&self) -> bool {
        matches!(self, PipelineError::Stage { stage: Stage::Ocr, .. })
    }

    /// Detection/captioning backend failure
    pub fn is_detection_error(&self) -> bool {
        matches!(
            self,
            PipelineError::Stage {
                stage: Stage::Labeling,
                ..
            }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled { .. })
    }
}
