// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Parse endpoint handlers

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::multipart::{MultipartError, MultipartRejection};
use axum_extra::extract::Multipart;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::request::{ParseApiRequest, UploadFields};
use super::response::ParseResponse;
use crate::api::errors::{ApiError, ApiErrorResponse};
use crate::api::http_server::{AppState, MAX_BODY_BYTES};
use crate::pipeline::ParseRequest;

/// POST /v1/parse - Parse a base64-encoded screenshot
///
/// # Request
/// - `image`: Base64-encoded screenshot (required)
/// - `boxThreshold`: Minimum detection confidence, defaults to 0.05
/// - `iouThreshold`: Overlap threshold for duplicate boxes, defaults to 0.1
/// - `language`: auto, en, es, fr, de or zh, defaults to auto
///
/// # Errors
/// - 400 Bad Request: missing or undecodable image, out-of-range thresholds
/// - 413 Payload Too Large: body over the size limit
/// - 499: client disconnected while parsing
/// - 500 Internal Server Error: OCR, labeling or image decode failed
pub async fn parse_handler(
    State(state): State<AppState>,
    payload: Result<Json<ParseApiRequest>, JsonRejection>,
) -> Result<Json<ParseResponse>, ApiErrorResponse> {
    let request_id = Uuid::new_v4().to_string();

    let Json(payload) = payload.map_err(|rejection| {
        warn!(%request_id, "Rejected parse body: {}", rejection.body_text());
        body_error(rejection.status(), rejection.body_text()).with_request_id(&request_id)
    })?;

    let request = payload
        .into_parse_request()
        .map_err(|e| e.with_request_id(&request_id))?;

    run_parse(&state, request, request_id).await
}

/// POST /v1/parse/upload - Parse a screenshot sent as a multipart form
///
/// Form fields: `image` (file), `box_threshold`, `iou_threshold`, `language`.
pub async fn upload_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ParseResponse>, ApiErrorResponse> {
    let request_id = Uuid::new_v4().to_string();

    let mut multipart = multipart.map_err(|rejection| {
        ApiError::InvalidRequest(rejection.body_text()).with_request_id(&request_id)
    })?;

    let mut fields = UploadFields::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e).with_request_id(&request_id))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| multipart_error(e).with_request_id(&request_id))?;
            fields.image = Some(bytes.to_vec());
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| multipart_error(e).with_request_id(&request_id))?;
            fields
                .set_text(&name, &value)
                .map_err(|e| e.with_request_id(&request_id))?;
        }
    }

    let request = fields
        .into_parse_request()
        .map_err(|e| e.with_request_id(&request_id))?;

    run_parse(&state, request, request_id).await
}

/// Run the pipeline, cancelling it if the client goes away
///
/// The handler future is dropped on disconnect, which drops the guard and
/// fires the token.
async fn run_parse(
    state: &AppState,
    request: ParseRequest,
    request_id: String,
) -> Result<Json<ParseResponse>, ApiErrorResponse> {
    let (width, height) = request.image.dimensions();
    debug!(
        %request_id,
        width,
        height,
        box_threshold = request.box_threshold,
        iou_threshold = request.iou_threshold,
        language = %request.language,
        "Parse request received"
    );

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let output = state
        .pipeline
        .process_async(request, cancel)
        .await
        .map_err(|e| {
            let stage = e.failed_stage();
            let error = ApiError::from(e);
            warn!(%request_id, ?stage, "Parse failed: {}", error);
            error.with_request_id(&request_id)
        })?;

    info!(
        %request_id,
        elements = output.parsed_elements.len(),
        language = %output.effective_language,
        processing_ms = output.processing_time_ms,
        "Parse complete"
    );

    let response = ParseResponse::from_output(output, request_id.clone())
        .map_err(|e| e.with_request_id(&request_id))?;
    Ok(Json(response))
}

fn body_error(status: StatusCode, message: String) -> ApiError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge {
            limit: MAX_BODY_BYTES,
        }
    } else {
        ApiError::InvalidRequest(message)
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    body_error(err.status(), err.body_text())
}
