// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ONNX Runtime session construction shared by the vision models
//!
//! The execution device is resolved once at startup. On CUDA the loaders
//! prefer a half-precision variant of each model file when one is present.

use anyhow::{Context, Result};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider, ExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Device the vision sessions execute on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceDevice {
    Cuda,
    Cpu,
}

impl InferenceDevice {
    /// Pick CUDA when the provider is usable, otherwise CPU
    pub fn detect(force_cpu: bool) -> Self {
        if force_cpu {
            info!("CPU execution forced by configuration");
            return Self::Cpu;
        }

        match CUDAExecutionProvider::default().is_available() {
            Ok(true) => {
                info!("CUDA execution provider available, using GPU inference");
                Self::Cuda
            }
            Ok(false) => {
                info!("CUDA execution provider not available, using CPU inference");
                Self::Cpu
            }
            Err(e) => {
                debug!("CUDA availability check failed: {}", e);
                Self::Cpu
            }
        }
    }

    /// Numeric precision used for model weights on this device
    pub fn precision(&self) -> Precision {
        match self {
            Self::Cuda => Precision::Half,
            Self::Cpu => Precision::Full,
        }
    }
}

impl fmt::Display for InferenceDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cuda => write!(f, "cuda"),
            Self::Cpu => write!(f, "cpu"),
        }
    }
}

/// Weight precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// fp16 weights (reduced precision, accelerated hardware only)
    Half,
    /// fp32 weights
    Full,
}

impl Precision {
    /// Precision of a model built from several sessions
    ///
    /// `Half` only when every session loaded an fp16 file.
    pub fn common(precisions: &[Precision]) -> Precision {
        if !precisions.is_empty() && precisions.iter().all(|p| *p == Precision::Half) {
            Precision::Half
        } else {
            Precision::Full
        }
    }
}

/// Options for building a session
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub device: InferenceDevice,
    pub intra_threads: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            device: InferenceDevice::Cpu,
            intra_threads: 4,
        }
    }
}

/// Resolve which file to load for a model given the device precision
///
/// `model.onnx` becomes `model_fp16.onnx` on half precision when that file
/// exists. Returns the path together with the precision actually used.
pub fn resolve_model_variant(path: &Path, device: InferenceDevice) -> (PathBuf, Precision) {
    if device.precision() == Precision::Half {
        if let (Some(stem), Some(parent)) = (path.file_stem(), path.parent()) {
            let candidate = parent.join(format!("{}_fp16.onnx", stem.to_string_lossy()));
            if candidate.exists() {
                return (candidate, Precision::Half);
            }
        }
    }
    (path.to_path_buf(), Precision::Full)
}

/// Build a session for a model file
pub fn build_session(model_path: &Path, options: &SessionOptions) -> Result<Session> {
    if !model_path.exists() {
        anyhow::bail!("Model file not found: {}", model_path.display());
    }

    let builder = Session::builder().context("Failed to create session builder")?;

    let builder = match options.device {
        InferenceDevice::Cuda => builder
            .with_execution_providers([
                CUDAExecutionProvider::default().build(),
                CPUExecutionProvider::default().build(),
            ])
            .context("Failed to set CUDA execution provider")?,
        InferenceDevice::Cpu => builder
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?,
    };

    let session = builder
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(options.intra_threads)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path)
        .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

    debug!(
        "Session ready for {} on {}",
        model_path.display(),
        options.device
    );

    Ok(session)
}

/// First input name of a session, or the given fallback
pub fn first_input_name(session: &Session, fallback: &str) -> String {
    session
        .inputs
        .first()
        .map(|input| input.name.clone())
        .unwrap_or_else(|| fallback.to_string())
}
