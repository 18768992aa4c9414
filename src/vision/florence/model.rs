// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Florence-2 captioner for icon crops

use anyhow::{Context, Result};
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use super::decoder::{FlorenceDecoder, DEFAULT_MAX_TOKENS};
use super::encoder::FlorenceEncoder;
use super::preprocessing::{normalize_icon_crop, preprocess_for_florence};
use crate::vision::session::{resolve_model_variant, InferenceDevice, Precision, SessionOptions};
use crate::vision::som::IconCaptioner;

/// Florence-2 captioner
///
/// Expected files in the model directory:
/// - `vision_encoder.onnx` (or `encoder.onnx`)
/// - `decoder_model.onnx` (or `decoder.onnx`)
/// - `embed_tokens.onnx`
/// - `tokenizer.json`
#[derive(Clone)]
pub struct FlorenceCaptioner {
    encoder: FlorenceEncoder,
    decoder: FlorenceDecoder,
    model_dir: PathBuf,
    precision: Precision,
}

impl std::fmt::Debug for FlorenceCaptioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlorenceCaptioner")
            .field("model_dir", &self.model_dir)
            .field("precision", &self.precision)
            .finish_non_exhaustive()
    }
}

impl FlorenceCaptioner {
    pub fn load(model_dir: &Path, options: &SessionOptions) -> Result<Self> {
        if !model_dir.is_dir() {
            anyhow::bail!(
                "Florence model directory not found: {}",
                model_dir.display()
            );
        }

        info!("Loading Florence-2 models from {}", model_dir.display());

        let files = FlorenceFiles::resolve(model_dir, options.device)?;
        let precision = files.precision;

        let encoder = FlorenceEncoder::new(&files.encoder, options)
            .context("Failed to load Florence encoder")?;
        let decoder = FlorenceDecoder::new(
            &files.decoder,
            &files.embed_tokens,
            &model_dir.join("tokenizer.json"),
            options,
        )
        .context("Failed to load Florence decoder")?
        .with_max_tokens(DEFAULT_MAX_TOKENS);

        info!("✅ Florence-2 captioner ready ({:?})", precision);

        Ok(Self {
            encoder,
            decoder,
            model_dir: model_dir.to_path_buf(),
            precision,
        })
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.decoder = self.decoder.with_max_tokens(max_tokens);
        self
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }
}

/// Session files of one Florence-2 model directory, after variant selection
#[derive(Debug, Clone, PartialEq)]
struct FlorenceFiles {
    encoder: PathBuf,
    decoder: PathBuf,
    embed_tokens: PathBuf,
    precision: Precision,
}

impl FlorenceFiles {
    fn resolve(model_dir: &Path, device: InferenceDevice) -> Result<Self> {
        let encoder = find_model_file(model_dir, &["vision_encoder.onnx", "encoder.onnx"])?;
        let decoder = find_model_file(model_dir, &["decoder_model.onnx", "decoder.onnx"])?;
        let embed_tokens = model_dir.join("embed_tokens.onnx");

        let (encoder, encoder_precision) = resolve_model_variant(&encoder, device);
        let (decoder, decoder_precision) = resolve_model_variant(&decoder, device);
        let (embed_tokens, embed_precision) = resolve_model_variant(&embed_tokens, device);

        Ok(Self {
            encoder,
            decoder,
            embed_tokens,
            precision: Precision::common(&[encoder_precision, decoder_precision, embed_precision]),
        })
    }
}

/// First file in `dir` matching one of `names`
fn find_model_file(dir: &Path, names: &[&str]) -> Result<PathBuf> {
    names
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Model file not found in {}. Tried: {:?}",
                dir.display(),
                names
            )
        })
}

impl IconCaptioner for FlorenceCaptioner {
    fn caption(&self, crop: &RgbImage, prompt: &str) -> Result<String> {
        let start = Instant::now();

        let tensor = preprocess_for_florence(&normalize_icon_crop(crop));
        let features = self
            .encoder
            .encode(tensor)
            .context("Failed to encode icon crop")?;
        let caption = self
            .decoder
            .generate(&features, prompt)
            .context("Failed to generate caption")?;

        debug!(
            caption_ms = start.elapsed().as_millis() as u64,
            "Icon captioned: '{}'", caption
        );
        Ok(caption)
    }
}
