// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::{DefaultBodyLimit, State},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::errors::ApiError;
use super::parse::{parse_handler, upload_handler};
use super::ui::index_handler;
use crate::pipeline::ScreenParsingPipeline;
use crate::version;
use crate::vision::VisionModelInfo;

/// Largest accepted request body; fits a base64 encoded image at the image size limit
pub const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ScreenParsingPipeline>,
    pub models: Arc<Vec<VisionModelInfo>>,
}

impl AppState {
    pub fn new(pipeline: ScreenParsingPipeline, models: Vec<VisionModelInfo>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            models: Arc::new(models),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub models: Vec<VisionModelInfo>,
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<VisionModelInfo>,
}

/// Build the router
///
/// `share` exposes the API to any origin.
pub fn create_app(state: AppState, share: bool) -> Router {
    let router = Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/v1/models", get(models_handler))
        .route("/v1/parse", post(parse_handler))
        .route("/v1/parse/upload", post(upload_handler))
        .fallback(fallback_handler)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http());

    let router = if share {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    };

    router.with_state(state)
}

/// Serve until `shutdown` is cancelled
pub async fn start_server(
    state: AppState,
    addr: SocketAddr,
    share: bool,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let app = create_app(state, share);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("🌐 Screen parser listening on http://{}", listener.local_addr()?);
    if share {
        info!("Public sharing enabled, cross-origin requests allowed");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: version::VERSION_NUMBER.to_string(),
        models: state.models.as_ref().clone(),
    })
}

async fn models_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(ModelsResponse {
        models: state.models.as_ref().clone(),
    })
}

async fn fallback_handler(uri: axum::http::Uri) -> super::errors::ApiErrorResponse {
    ApiError::NotFound(format!("No route for {}", uri.path())).into()
}
