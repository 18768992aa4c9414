// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Screen parsing pipeline
//!
//! Orchestrates one request end to end:
//!
//! 1. validate arguments
//! 2. remap RGB to BGR
//! 3. OCR
//! 4. resolve the effective language (`auto` runs detection)
//! 5. normalize OCR text element-wise
//! 6. detect + caption + draw (one labeler call)
//! 7. decode the annotated PNG and join element descriptions
//!
//! The pipeline holds only read-only, `Arc`-shared collaborators and the
//! draw style, so one instance serves every request.

pub mod error;
pub mod request;
pub mod services;

pub use error::{PipelineError, Stage};
pub use request::{
    LanguageSelector, ParseRequest, DEFAULT_BOX_THRESHOLD, DEFAULT_IOU_THRESHOLD,
    DEFAULT_LANGUAGE,
};
pub use services::{
    ElementKind, ElementLabeler, LabelCoordinate, LabelRequest, LabeledScreen, LanguageDetector,
    OcrEngine, OcrOutput,
};

use image::RgbImage;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::DrawBoxConfig;
use crate::vision::image_utils::{decode_base64_rgb, BgrImage};
use crate::vision::text::post_process_text;

/// Result of a successful parse
#[derive(Debug, Clone)]
pub struct ParseOutput {
    /// Input screenshot with numbered element boxes drawn on it
    pub annotated_image: RgbImage,
    /// Element descriptions in labeler order
    pub parsed_elements: Vec<String>,
    /// `parsed_elements` joined with `\n`, one line per element
    pub parsed_text: String,
    pub label_coordinates: Vec<LabelCoordinate>,
    /// Language the request resolved to; reported only
    pub effective_language: String,
    pub ocr_goal_filtered: bool,
    pub processing_time_ms: u64,
}

/// Text normalization applied to every OCR string
pub type TextNormalizer = fn(&str) -> String;

const STAGES: [Stage; 7] = [
    Stage::Validation,
    Stage::ColorConversion,
    Stage::Ocr,
    Stage::LanguageDetection,
    Stage::TextNormalization,
    Stage::Labeling,
    Stage::ImageDecode,
];

/// Last stage a request entered, readable from another task
#[derive(Debug, Clone, Default)]
struct StageTracker(Arc<AtomicU8>);

impl StageTracker {
    fn enter(&self, stage: Stage) {
        let index = STAGES.iter().position(|s| *s == stage).unwrap_or(0);
        self.0.store(index as u8, Ordering::Relaxed);
    }

    fn current(&self) -> Stage {
        STAGES
            .get(self.0.load(Ordering::Relaxed) as usize)
            .copied()
            .unwrap_or(Stage::Validation)
    }
}

#[derive(Clone)]
pub struct ScreenParsingPipeline {
    ocr: Arc<dyn OcrEngine>,
    language_detector: Arc<dyn LanguageDetector>,
    labeler: Arc<dyn ElementLabeler>,
    normalizer: TextNormalizer,
    draw_config: DrawBoxConfig,
}

impl ScreenParsingPipeline {
    pub fn new(
        ocr: Arc<dyn OcrEngine>,
        language_detector: Arc<dyn LanguageDetector>,
        labeler: Arc<dyn ElementLabeler>,
        draw_config: DrawBoxConfig,
    ) -> Self {
        Self {
            ocr,
            language_detector,
            labeler,
            normalizer: post_process_text,
            draw_config,
        }
    }

    /// Replace the default text normalization
    pub fn with_normalizer(mut self, normalizer: TextNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn draw_config(&self) -> DrawBoxConfig {
        self.draw_config
    }

    /// Run a request to completion on the current thread
    pub fn process(
        &self,
        request: &ParseRequest,
        cancel: &CancellationToken,
    ) -> Result<ParseOutput, PipelineError> {
        self.run(request, cancel, &StageTracker::default())
    }

    /// Run a request on the blocking pool
    ///
    /// Returns `Cancelled` as soon as `cancel` fires; the blocking task
    /// stops at its next stage boundary.
    pub async fn process_async(
        &self,
        request: ParseRequest,
        cancel: CancellationToken,
    ) -> Result<ParseOutput, PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled {
                stage: Stage::Validation,
            });
        }

        let tracker = StageTracker::default();
        let pipeline = self.clone();
        let task_cancel = cancel.clone();
        let task_tracker = tracker.clone();

        tokio::select! {
            result = tokio::task::spawn_blocking(move || {
                pipeline.run(&request, &task_cancel, &task_tracker)
            }) => {
                result.map_err(|e| PipelineError::TaskFailed(e.to_string()))?
            }
            _ = cancel.cancelled() => {
                let stage = tracker.current();
                warn!(%stage, "⚠️  Parse request cancelled");
                Err(PipelineError::Cancelled { stage })
            }
        }
    }

    fn run(
        &self,
        request: &ParseRequest,
        cancel: &CancellationToken,
        tracker: &StageTracker,
    ) -> Result<ParseOutput, PipelineError> {
        let start = Instant::now();

        tracker.enter(Stage::Validation);
        request.validate()?;

        let check = |stage: Stage| -> Result<(), PipelineError> {
            tracker.enter(stage);
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled { stage });
            }
            Ok(())
        };

        check(Stage::ColorConversion)?;
        let bgr = BgrImage::from_rgb(&request.image);

        check(Stage::Ocr)?;
        let ocr_start = Instant::now();
        let ocr = self
            .ocr
            .recognize(&bgr)
            .map_err(|e| PipelineError::stage(Stage::Ocr, e))?;
        debug!(
            regions = ocr.len(),
            ocr_ms = ocr_start.elapsed().as_millis() as u64,
            "OCR complete"
        );

        check(Stage::LanguageDetection)?;
        let effective_language = self.resolve_language(request.language, ocr.texts());

        check(Stage::TextNormalization)?;
        let (texts, boxes, goal_filtered) = ocr.into_parts();
        let texts: Vec<String> = texts.iter().map(|t| (self.normalizer)(t)).collect();

        check(Stage::Labeling)?;
        let label_start = Instant::now();
        let labeled = self
            .labeler
            .label(&LabelRequest {
                image: &bgr,
                box_threshold: request.box_threshold,
                iou_threshold: request.iou_threshold,
                ocr_boxes: &boxes,
                ocr_texts: &texts,
                draw_config: self.draw_config,
                cancel,
            })
            .map_err(|e| {
                if cancel.is_cancelled() {
                    PipelineError::Cancelled {
                        stage: Stage::Labeling,
                    }
                } else {
                    PipelineError::stage(Stage::Labeling, e)
                }
            })?;
        debug!(
            elements = labeled.parsed_elements.len(),
            label_ms = label_start.elapsed().as_millis() as u64,
            "Labeling complete"
        );

        check(Stage::ImageDecode)?;
        let annotated_image = decode_base64_rgb(&labeled.annotated_image_base64)
            .map_err(|e| PipelineError::stage(Stage::ImageDecode, e))?;

        let parsed_text = join_elements(&labeled.parsed_elements);
        let processing_time_ms = start.elapsed().as_millis() as u64;

        info!(
            elements = labeled.parsed_elements.len(),
            language = %effective_language,
            processing_time_ms,
            "✅ Screen parsed"
        );

        Ok(ParseOutput {
            annotated_image,
            parsed_elements: labeled.parsed_elements,
            parsed_text,
            label_coordinates: labeled.label_coordinates,
            effective_language,
            ocr_goal_filtered: goal_filtered,
            processing_time_ms,
        })
    }

    /// Effective language for a request
    ///
    /// `auto` runs the detector over the OCR texts joined by a single space
    /// and falls back to `en` when nothing is detected.
    pub fn resolve_language(&self, selector: LanguageSelector, texts: &[String]) -> String {
        match selector.code() {
            Some(code) => code.to_string(),
            None => {
                let joined = texts.join(" ");
                self.language_detector
                    .detect(&joined)
                    .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
            }
        }
    }
}

/// Join element descriptions one per line
///
/// Newlines inside an element are flattened so the line count always
/// equals the element count.
pub fn join_elements(elements: &[String]) -> String {
    elements
        .iter()
        .map(|element| {
            if element.contains(['\n', '\r']) {
                element.replace("\r\n", " ").replace(['\n', '\r'], " ")
            } else {
                element.clone()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
