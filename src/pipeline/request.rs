// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Parse request, language selection and argument validation

use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::PipelineError;

/// Default minimum detection confidence
pub const DEFAULT_BOX_THRESHOLD: f32 = 0.05;

/// Default overlap threshold for removing duplicate boxes
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.1;

/// Language used when detection has nothing to work with
pub const DEFAULT_LANGUAGE: &str = "en";

/// Language chosen for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageSelector {
    /// Detect from the OCR text
    #[default]
    Auto,
    En,
    Es,
    Fr,
    De,
    Zh,
}

impl LanguageSelector {
    pub const ALL: [LanguageSelector; 6] = [
        LanguageSelector::Auto,
        LanguageSelector::En,
        LanguageSelector::Es,
        LanguageSelector::Fr,
        LanguageSelector::De,
        LanguageSelector::Zh,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageSelector::Auto => "auto",
            LanguageSelector::En => "en",
            LanguageSelector::Es => "es",
            LanguageSelector::Fr => "fr",
            LanguageSelector::De => "de",
            LanguageSelector::Zh => "zh",
        }
    }

    /// Literal language code, `None` for `auto`
    pub fn code(&self) -> Option<&'static str> {
        match self {
            LanguageSelector::Auto => None,
            other => Some(other.as_str()),
        }
    }
}

impl fmt::Display for LanguageSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LanguageSelector {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        LanguageSelector::ALL
            .into_iter()
            .find(|selector| selector.as_str() == normalized)
            .ok_or_else(|| {
                PipelineError::invalid(
                    "language",
                    format!(
                        "unsupported language '{}', supported: auto, en, es, fr, de, zh",
                        s
                    ),
                )
            })
    }
}

/// One screen parsing request
#[derive(Debug, Clone)]
pub struct ParseRequest {
    /// Uploaded screenshot in RGB order
    pub image: RgbImage,
    /// Minimum detection confidence, in (0, 1]
    pub box_threshold: f32,
    /// Overlap threshold for duplicate removal, in (0, 1]
    pub iou_threshold: f32,
    pub language: LanguageSelector,
}

impl ParseRequest {
    /// Request with default thresholds and automatic language detection
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            box_threshold: DEFAULT_BOX_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            language: LanguageSelector::Auto,
        }
    }

    pub fn with_box_threshold(mut self, threshold: f32) -> Self {
        self.box_threshold = threshold;
        self
    }

    pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold;
        self
    }

    pub fn with_language(mut self, language: LanguageSelector) -> Self {
        self.language = language;
        self
    }

    /// Reject arguments no collaborator should ever see
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.image.width() == 0 || self.image.height() == 0 {
            return Err(PipelineError::invalid(
                "image",
                format!(
                    "image must be non-empty, got {}x{}",
                    self.image.width(),
                    self.image.height()
                ),
            ));
        }
        validate_threshold("box_threshold", self.box_threshold)?;
        validate_threshold("iou_threshold", self.iou_threshold)?;
        Ok(())
    }
}

fn validate_threshold(field: &'static str, value: f32) -> Result<(), PipelineError> {
    if !value.is_finite() || value <= 0.0 || value > 1.0 {
        return Err(PipelineError::invalid(
            field,
            format!("{} must be in (0, 1], got {}", field, value),
        ));
    }
    Ok(())
}
