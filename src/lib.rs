// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod pipeline;
pub mod version;
pub mod vision;

pub use config::{AppConfig, DeviceClass, DrawBoxConfig};
pub use pipeline::{
    LanguageSelector, ParseOutput, ParseRequest, PipelineError, ScreenParsingPipeline, Stage,
};
pub use vision::{VisionModelConfig, VisionModelManager};
