// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Parse request types and conversion

use serde::{Deserialize, Serialize};

use crate::api::errors::ApiError;
use crate::pipeline::{LanguageSelector, ParseRequest, DEFAULT_BOX_THRESHOLD, DEFAULT_IOU_THRESHOLD};
use crate::vision::{decode_base64_image, decode_image_bytes};

fn default_box_threshold() -> f32 {
    DEFAULT_BOX_THRESHOLD
}

fn default_iou_threshold() -> f32 {
    DEFAULT_IOU_THRESHOLD
}

fn default_language() -> String {
    LanguageSelector::Auto.as_str().to_string()
}

/// JSON body of `POST /v1/parse`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseApiRequest {
    /// Base64-encoded screenshot (plain or `data:` URL)
    #[serde(default)]
    pub image: Option<String>,

    #[serde(default = "default_box_threshold")]
    pub box_threshold: f32,

    #[serde(default = "default_iou_threshold")]
    pub iou_threshold: f32,

    /// auto, en, es, fr, de or zh
    #[serde(default = "default_language")]
    pub language: String,
}

impl ParseApiRequest {
    /// Decode the image and build a pipeline request
    ///
    /// Thresholds are range-checked by the pipeline itself.
    pub fn into_parse_request(self) -> Result<ParseRequest, ApiError> {
        let image = self
            .image
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ApiError::ValidationError {
                field: "image".to_string(),
                message: "image is required".to_string(),
            })?;

        let (decoded, _) = decode_base64_image(&image)?;
        let language = parse_language(&self.language)?;

        Ok(ParseRequest::new(decoded.to_rgb8())
            .with_box_threshold(self.box_threshold)
            .with_iou_threshold(self.iou_threshold)
            .with_language(language))
    }
}

/// Fields collected from a multipart upload
#[derive(Debug, Clone, Default)]
pub struct UploadFields {
    pub image: Option<Vec<u8>>,
    pub box_threshold: Option<f32>,
    pub iou_threshold: Option<f32>,
    pub language: Option<String>,
}

impl UploadFields {
    /// Record a text field; unknown names are ignored
    pub fn set_text(&mut self, name: &str, value: &str) -> Result<(), ApiError> {
        match name {
            "box_threshold" | "boxThreshold" => {
                self.box_threshold = Some(parse_threshold("box_threshold", value)?)
            }
            "iou_threshold" | "iouThreshold" => {
                self.iou_threshold = Some(parse_threshold("iou_threshold", value)?)
            }
            "language" => self.language = Some(value.trim().to_string()),
            _ => {}
        }
        Ok(())
    }

    pub fn into_parse_request(self) -> Result<ParseRequest, ApiError> {
        let bytes = self
            .image
            .filter(|b| !b.is_empty())
            .ok_or_else(|| ApiError::ValidationError {
                field: "image".to_string(),
                message: "image file is required".to_string(),
            })?;

        let (decoded, _) = decode_image_bytes(&bytes)?;
        let language = match self.language.as_deref() {
            Some(value) if !value.is_empty() => parse_language(value)?,
            _ => LanguageSelector::default(),
        };

        Ok(ParseRequest::new(decoded.to_rgb8())
            .with_box_threshold(self.box_threshold.unwrap_or(DEFAULT_BOX_THRESHOLD))
            .with_iou_threshold(self.iou_threshold.unwrap_or(DEFAULT_IOU_THRESHOLD))
            .with_language(language))
    }
}

fn parse_language(value: &str) -> Result<LanguageSelector, ApiError> {
    value.parse::<LanguageSelector>().map_err(ApiError::from)
}

fn parse_threshold(field: &str, value: &str) -> Result<f32, ApiError> {
    value
        .trim()
        .parse::<f32>()
        .map_err(|_| ApiError::ValidationError {
            field: field.to_string(),
            message: format!("'{}' is not a number", value.trim()),
        })
}
