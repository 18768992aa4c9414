// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Florence-2 vision encoder model

use anyhow::{Context, Result};
use ndarray::{Array2, Array4, Axis, Ix2};
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::vision::session::{build_session, first_input_name, SessionOptions};

/// Florence-2 vision encoder
///
/// Maps a `[1, 3, 768, 768]` image tensor to `[seq_len, embed_dim]` features.
#[derive(Clone)]
pub struct FlorenceEncoder {
    session: Arc<Mutex<Session>>,
    input_name: String,
}

impl std::fmt::Debug for FlorenceEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlorenceEncoder")
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl FlorenceEncoder {
    pub fn new(model_path: &Path, options: &SessionOptions) -> Result<Self> {
        if !model_path.exists() {
            anyhow::bail!(
                "Florence encoder model not found: {}",
                model_path.display()
            );
        }

        info!(
            "Loading Florence vision encoder from {}",
            model_path.display()
        );

        let session = build_session(model_path, options)
            .context("Failed to load Florence encoder model")?;
        let input_name = first_input_name(&session, "pixel_values");

        info!("✅ Florence encoder loaded on {}", options.device);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
        })
    }

    /// Encode an image tensor into visual features
    pub fn encode(&self, input: Array4<f32>) -> Result<Array2<f32>> {
        let shape = input.shape();
        if shape[0] != 1 || shape[1] != 3 {
            anyhow::bail!("Invalid input shape: {:?}, expected [1, 3, H, W]", shape);
        }

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Florence encoder session lock poisoned"))?;

        let input_value = Value::from_array(input).context("Failed to create input tensor")?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .context("Encoder inference failed")?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;
        debug!("Encoder output shape: {:?}", output.shape());

        let mut features = output.view();
        while features.ndim() > 2 {
            features = features.index_axis_move(Axis(0), 0);
        }
        let features = features
            .into_dimensionality::<Ix2>()
            .context("Unexpected encoder output shape")?;

        Ok(features.to_owned())
    }
}
