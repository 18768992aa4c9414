// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::pipeline::{PipelineError, Stage};
use crate::vision::ImageError;

/// Non-standard status used when the client went away mid-request
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
    pub request_id: Option<String>,
    pub details: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    NotFound(String),
    InvalidRequest(String),
    ValidationError {
        field: String,
        message: String,
    },
    InvalidImage(String),
    PayloadTooLarge {
        limit: usize,
    },
    ProcessingFailed {
        stage: Stage,
        message: String,
    },
    Cancelled {
        stage: Stage,
    },
    InternalError(String),
}

impl ApiError {
    pub fn to_response(&self, request_id: Option<String>) -> ErrorResponse {
        let (error_type, message, details) = match self {
            ApiError::NotFound(msg) => ("not_found", msg.clone(), None),
            ApiError::InvalidRequest(msg) => ("invalid_request", msg.clone(), None),
            ApiError::ValidationError { field, message } => {
                let mut details = HashMap::new();
                details.insert(
                    "field".to_string(),
                    serde_json::Value::String(field.clone()),
                );
                ("validation_error", message.clone(), Some(details))
            }
            ApiError::InvalidImage(msg) => ("invalid_image", msg.clone(), None),
            ApiError::PayloadTooLarge { limit } => {
                let mut details = HashMap::new();
                details.insert(
                    "limit_bytes".to_string(),
                    serde_json::Value::Number((*limit).into()),
                );
                (
                    "payload_too_large",
                    "Request body is too large".to_string(),
                    Some(details),
                )
            }
            ApiError::ProcessingFailed { stage, message } => (
                "processing_failed",
                message.clone(),
                Some(stage_details(*stage)),
            ),
            ApiError::Cancelled { stage } => (
                "cancelled",
                "Request was cancelled".to_string(),
                Some(stage_details(*stage)),
            ),
            ApiError::InternalError(msg) => ("internal_error", msg.clone(), None),
        };

        ErrorResponse {
            error_type: error_type.to_string(),
            message,
            request_id,
            details,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::InvalidRequest(_)
            | ApiError::ValidationError { .. }
            | ApiError::InvalidImage(_) => 400,
            ApiError::PayloadTooLarge { .. } => 413,
            ApiError::Cancelled { .. } => CLIENT_CLOSED_REQUEST,
            ApiError::ProcessingFailed { .. } | ApiError::InternalError(_) => 500,
        }
    }

    /// Attach a request id for the HTTP response
    pub fn with_request_id(self, request_id: impl Into<String>) -> ApiErrorResponse {
        ApiErrorResponse {
            error: self,
            request_id: Some(request_id.into()),
        }
    }
}

fn stage_details(stage: Stage) -> HashMap<String, serde_json::Value> {
    let mut details = HashMap::new();
    details.insert(
        "stage".to_string(),
        serde_json::Value::String(stage.to_string()),
    );
    details
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::ValidationError { field, message } => {
                write!(f, "Validation error for {}: {}", field, message)
            }
            ApiError::InvalidImage(msg) => write!(f, "Invalid image: {}", msg),
            ApiError::PayloadTooLarge { limit } => {
                write!(f, "Payload too large, limit is {} bytes", limit)
            }
            ApiError::ProcessingFailed { stage, message } => {
                write!(f, "Processing failed at {}: {}", stage, message)
            }
            ApiError::Cancelled { stage } => write!(f, "Cancelled during {}", stage),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidArgument { field, message } => ApiError::ValidationError {
                field: field.to_string(),
                message,
            },
            PipelineError::Stage { stage, cause } => ApiError::ProcessingFailed {
                stage,
                message: format!("{:#}", cause),
            },
            PipelineError::Cancelled { stage } => ApiError::Cancelled { stage },
            PipelineError::TaskFailed(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<ImageError> for ApiError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::TooLarge(_, limit) => ApiError::PayloadTooLarge { limit },
            other => ApiError::InvalidImage(other.to_string()),
        }
    }
}

/// Error response wrapper
#[derive(Debug)]
pub struct ApiErrorResponse {
    pub error: ApiError,
    pub request_id: Option<String>,
}

impl From<ApiError> for ApiErrorResponse {
    fn from(error: ApiError) -> Self {
        Self {
            error,
            request_id: None,
        }
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = self.error.to_response(self.request_id);

        (status, Json(body)).into_response()
    }
}
