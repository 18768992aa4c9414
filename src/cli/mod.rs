// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use clap::Parser;
use std::path::PathBuf;

use crate::config::{AppConfig, DeviceClass, ServerConfig, DEFAULT_HOST, DEFAULT_PORT};
use crate::vision::VisionModelConfig;

/// Screen parser server
#[derive(Parser, Debug)]
#[command(name = "screen-parser")]
#[command(version)]
#[command(about = "Parse GUI screenshots into annotated images and element lists", long_about = None)]
pub struct Cli {
    /// Address to bind the HTTP server to
    #[arg(long, env = "SCREEN_PARSER_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to bind the HTTP server to
    #[arg(long, env = "SCREEN_PARSER_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Expose the endpoint publicly (allow cross-origin requests from anywhere)
    #[arg(long, env = "SCREEN_PARSER_SHARE")]
    pub share: bool,

    /// Device class of the screenshots, selects the annotation style
    #[arg(long, env = "SCREEN_PARSER_DEVICE_CLASS", value_enum, default_value_t = DeviceClass::Pc)]
    pub device_class: DeviceClass,

    /// Icon detection model (ONNX)
    #[arg(long, env = "ICON_DETECT_MODEL", default_value = "weights/icon_detect/model.onnx")]
    pub icon_detect_model: PathBuf,

    /// Florence-2 icon caption model directory
    #[arg(long, env = "ICON_CAPTION_MODEL_DIR", default_value = "weights/icon_caption_florence")]
    pub caption_model_dir: PathBuf,

    /// PaddleOCR model directory (det_model.onnx, rec_model.onnx, ppocr_keys.txt)
    #[arg(long, env = "OCR_MODEL_DIR", default_value = "weights/ocr")]
    pub ocr_model_dir: PathBuf,

    /// TrueType font used for element ID tags
    #[arg(long, env = "LABEL_FONT")]
    pub label_font: Option<PathBuf>,

    /// Prompt given to the captioner for every icon crop
    #[arg(long, env = "CAPTION_PROMPT", default_value = "<CAPTION>")]
    pub caption_prompt: String,

    /// ONNX Runtime intra-op threads per session
    #[arg(long, env = "ORT_INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,

    /// Never use GPU execution even when available
    #[arg(long, env = "FORCE_CPU")]
    pub force_cpu: bool,
}

impl Cli {
    pub fn into_config(self) -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: self.host,
                port: self.port,
                share: self.share,
            },
            device_class: self.device_class,
            vision: VisionModelConfig {
                icon_detect_model: self.icon_detect_model,
                caption_model_dir: self.caption_model_dir,
                ocr_model_dir: self.ocr_model_dir,
                caption_prompt: self.caption_prompt,
                intra_threads: self.intra_threads,
                force_cpu: self.force_cpu,
            },
            label_font: self.label_font,
        }
    }
}
