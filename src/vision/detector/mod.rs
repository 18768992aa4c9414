// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLO-style GUI element (icon) detector

pub mod postprocess;

pub use postprocess::{nms, postprocess_output, Detection};

use anyhow::{Context, Result};
use image::RgbImage;
use ort::session::Session;
use ort::value::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info};

use crate::vision::ocr::preprocessing::{resize_with_padding, to_nchw_tensor};
use crate::vision::session::{
    build_session, first_input_name, resolve_model_variant, Precision, SessionOptions,
};
use crate::vision::som::ElementDetector;

/// Square model input size
pub const DETECTOR_INPUT_SIZE: u32 = 640;

/// IoU above which overlapping detections are suppressed
pub const NMS_IOU_THRESHOLD: f32 = 0.7;

/// Letterbox fill value
const LETTERBOX_PAD: u8 = 114;

/// Icon detector backed by an ONNX export of the YOLO model
#[derive(Clone)]
pub struct IconDetector {
    session: Arc<Mutex<Session>>,
    input_name: String,
    model_path: PathBuf,
    precision: Precision,
}

impl std::fmt::Debug for IconDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IconDetector")
            .field("model_path", &self.model_path)
            .field("input_name", &self.input_name)
            .field("precision", &self.precision)
            .finish_non_exhaustive()
    }
}

impl IconDetector {
    pub fn load(model_path: &Path, options: &SessionOptions) -> Result<Self> {
        if !model_path.exists() {
            anyhow::bail!("Icon detection model not found: {}", model_path.display());
        }

        let (path, precision) = resolve_model_variant(model_path, options.device);
        info!("Loading icon detector from {}", path.display());

        let session = build_session(&path, options).context("Failed to load icon detector")?;
        let input_name = first_input_name(&session, "images");

        info!("✅ Icon detector loaded on {} ({:?})", options.device, precision);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            model_path: path,
            precision,
        })
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }
}

impl ElementDetector for IconDetector {
    fn detect(&self, image: &RgbImage, box_threshold: f32) -> Result<Vec<Detection>> {
        let start = Instant::now();

        let (letterboxed, info) = resize_with_padding(image, DETECTOR_INPUT_SIZE, LETTERBOX_PAD);
        let input = to_nchw_tensor(&letterboxed, [0.0; 3], [1.0; 3]);

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Icon detector session lock poisoned"))?;

        let input_value = Value::from_array(input).context("Failed to create input tensor")?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .context("Icon detection inference failed")?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let detections = postprocess_output(output.view(), box_threshold, NMS_IOU_THRESHOLD, &info)?;

        debug!(
            detections = detections.len(),
            detect_ms = start.elapsed().as_millis() as u64,
            "Icon detection complete"
        );
        Ok(detections)
    }
}
