// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PaddleOCR text recognition model
//!
//! Recognizes the text inside a cropped line image. The model emits a class
//! distribution per timestep which is decoded with greedy CTC.

use anyhow::{Context, Result};
use image::RgbImage;
use ndarray::{ArrayViewD, Axis, Ix2};
use ort::session::Session;
use ort::value::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::preprocessing::{preprocess_for_recognition, REC_INPUT_HEIGHT};
use crate::vision::session::{build_session, first_input_name, SessionOptions};

/// Recognized text with confidence score
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedText {
    pub text: String,
    /// Mean probability of the emitted characters (0.0-1.0)
    pub confidence: f32,
}

impl RecognizedText {
    pub fn new(text: String, confidence: f32) -> Self {
        Self { text, confidence }
    }

    /// Check if the text is empty or whitespace only
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Load a PaddleOCR character dictionary
///
/// One character per line. Index 0 is reserved for the CTC blank and a
/// trailing space class is appended, matching the recognition head layout.
pub fn load_dictionary(path: &Path) -> Result<Vec<char>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open dictionary: {}", path.display()))?;

    let mut dictionary = vec!['\0'];
    for line in BufReader::new(file).lines() {
        let line = line.context("Failed to read dictionary line")?;
        let line = line.trim_end_matches(['\r', '\n']);
        if let Some(ch) = line.chars().next() {
            dictionary.push(ch);
        }
    }

    if dictionary.len() == 1 {
        anyhow::bail!("OCR character dictionary is empty: {}", path.display());
    }
    dictionary.push(' ');

    Ok(dictionary)
}

/// Greedy CTC decoding of a `[T, C]` (or `[1, T, C]`) class distribution
///
/// Repeated classes collapse, blanks (class 0) separate repeats and are
/// dropped. Classes outside the dictionary are ignored.
pub fn ctc_decode(output: ArrayViewD<f32>, dictionary: &[char]) -> Result<RecognizedText> {
    let mut probs = output;
    while probs.ndim() > 2 {
        probs = probs.index_axis_move(Axis(0), 0);
    }
    let probs = probs
        .into_dimensionality::<Ix2>()
        .context("Unexpected recognition output shape")?;

    let mut text = String::new();
    let mut total = 0.0f32;
    let mut emitted = 0usize;
    let mut previous = 0usize;

    for row in probs.rows() {
        let (index, prob) = row
            .iter()
            .copied()
            .enumerate()
            .fold((0usize, f32::NEG_INFINITY), |best, (i, p)| {
                if p > best.1 {
                    (i, p)
                } else {
                    best
                }
            });

        if index != 0 && index != previous {
            if let Some(&ch) = dictionary.get(index) {
                text.push(ch);
                total += prob;
                emitted += 1;
            }
        }
        previous = index;
    }

    let confidence = if emitted == 0 {
        0.0
    } else {
        (total / emitted as f32).clamp(0.0, 1.0)
    };

    Ok(RecognizedText::new(text, confidence))
}

/// PaddleOCR text recognition model
#[derive(Clone)]
pub struct OcrRecognitionModel {
    session: Arc<Mutex<Session>>,
    dictionary: Arc<Vec<char>>,
    input_name: String,
}

impl std::fmt::Debug for OcrRecognitionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrRecognitionModel")
            .field("dictionary_size", &self.dictionary.len())
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl OcrRecognitionModel {
    /// Load the recognition model (rec_model.onnx) and its dictionary
    pub fn new(model_path: &Path, dict_path: &Path, options: &SessionOptions) -> Result<Self> {
        if !model_path.exists() {
            anyhow::bail!("OCR recognition model not found: {}", model_path.display());
        }
        if !dict_path.exists() {
            anyhow::bail!(
                "OCR character dictionary not found: {}",
                dict_path.display()
            );
        }

        info!(
            "Loading OCR recognition model from {}",
            model_path.display()
        );

        let dictionary = load_dictionary(dict_path)?;
        info!(
            "Loaded character dictionary with {} characters",
            dictionary.len()
        );

        let session = build_session(model_path, options)
            .context("Failed to load OCR recognition model")?;
        let input_name = first_input_name(&session, "x");

        info!("✅ OCR recognition model loaded on {}", options.device);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            dictionary: Arc::new(dictionary),
            input_name,
        })
    }

    pub fn dictionary_size(&self) -> usize {
        self.dictionary.len()
    }

    /// Recognize the text in a cropped line image
    pub fn recognize(&self, crop: &RgbImage) -> Result<RecognizedText> {
        let input = preprocess_for_recognition(crop);
        debug_assert_eq!(input.shape()[2], REC_INPUT_HEIGHT as usize);

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("OCR recognition session lock poisoned"))?;

        let input_value = Value::from_array(input).context("Failed to create input tensor")?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .context("Recognition inference failed")?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;
        debug!("Recognition output shape: {:?}", output.shape());

        ctc_decode(output.view(), &self.dictionary)
    }
}
