// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Parse response types

use serde::{Deserialize, Serialize};

use crate::api::errors::ApiError;
use crate::pipeline::{LabelCoordinate, ParseOutput};
use crate::vision::encode_png_base64;

/// Response of both parse endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResponse {
    /// Annotated screenshot, base64 PNG
    pub annotated_image: String,
    pub parsed_elements: Vec<String>,
    /// One line per element
    pub parsed_text: String,
    pub label_coordinates: Vec<LabelCoordinate>,
    pub effective_language: String,
    pub width: u32,
    pub height: u32,
    pub processing_time_ms: u64,
    pub request_id: String,
}

impl ParseResponse {
    pub fn from_output(output: ParseOutput, request_id: String) -> Result<Self, ApiError> {
        let (width, height) = output.annotated_image.dimensions();
        let annotated_image = encode_png_base64(&output.annotated_image)
            .map_err(|e| ApiError::InternalError(e.to_string()))?;

        Ok(Self {
            annotated_image,
            parsed_elements: output.parsed_elements,
            parsed_text: output.parsed_text,
            label_coordinates: output.label_coordinates,
            effective_language: output.effective_language,
            width,
            height,
            processing_time_ms: output.processing_time_ms,
            request_id,
        })
    }
}
