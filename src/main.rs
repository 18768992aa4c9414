// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Parser;
use screen_parser::{
    api::{start_server, AppState},
    cli::Cli,
    pipeline::ScreenParsingPipeline,
    version,
    vision::som::{BoxAnnotator, LabelFont, SomLabeler},
    vision::{VisionModelManager, WhatlangDetector},
};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Cli::parse().into_config();
    config.validate().context("Invalid configuration")?;

    info!("🚀 Starting {}", version::get_version_string());
    info!("Build: {}", version::VERSION);
    info!("Features: {}", version::FEATURES.join(", "));
    info!(
        device_class = %config.device_class,
        share = config.server.share,
        "Configuration loaded"
    );

    let vision_config = config.vision.clone();
    let models = match tokio::task::spawn_blocking(move || VisionModelManager::load(&vision_config))
        .await
        .context("Model loading task failed")?
    {
        Ok(models) => models,
        Err(e) => {
            let e = anyhow::Error::from(e);
            error!("❌ {:#}", e);
            return Err(e);
        }
    };

    let font = LabelFont::discover(config.label_font.as_deref());
    let labeler = SomLabeler::new(models.detector(), models.captioner(), BoxAnnotator::new(font))
        .with_caption_prompt(config.vision.caption_prompt.clone());

    let pipeline = ScreenParsingPipeline::new(
        models.ocr(),
        Arc::new(WhatlangDetector::new()),
        Arc::new(labeler),
        config.draw_config(),
    );

    let state = AppState::new(pipeline, models.list_models());
    let addr = config.server.socket_addr()?;

    let shutdown = CancellationToken::new();
    let mut server = tokio::spawn(start_server(
        state,
        addr,
        config.server.share,
        shutdown.clone(),
    ));

    tokio::select! {
        result = &mut server => {
            return result.context("Server task failed")?;
        }
        _ = signal::ctrl_c() => {
            info!("⏹️  Shutting down...");
            shutdown.cancel();
        }
    }

    server.await.context("Server task failed")??;
    info!("👋 Goodbye!");
    Ok(())
}
