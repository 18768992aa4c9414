// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Collaborator contracts used by the screen parsing pipeline

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::DrawBoxConfig;
use crate::vision::geometry::BoundingBox;
use crate::vision::image_utils::BgrImage;

/// Text regions found by an OCR engine
///
/// `texts[i]` is the text read inside `boxes[i]`; both always have the
/// same length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OcrOutput {
    texts: Vec<String>,
    boxes: Vec<BoundingBox>,
    goal_filtered: bool,
}

impl OcrOutput {
    pub fn new(texts: Vec<String>, boxes: Vec<BoundingBox>, goal_filtered: bool) -> Result<Self> {
        if texts.len() != boxes.len() {
            anyhow::bail!(
                "OCR produced {} texts but {} boxes",
                texts.len(),
                boxes.len()
            );
        }
        Ok(Self {
            texts,
            boxes,
            goal_filtered,
        })
    }

    /// Build from `(text, box)` pairs
    pub fn from_regions<I>(regions: I) -> Self
    where
        I: IntoIterator<Item = (String, BoundingBox)>,
    {
        let (texts, boxes) = regions.into_iter().unzip();
        Self {
            texts,
            boxes,
            goal_filtered: false,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    pub fn boxes(&self) -> &[BoundingBox] {
        &self.boxes
    }

    /// Whether the engine applied goal-based filtering (informational only)
    pub fn goal_filtered(&self) -> bool {
        self.goal_filtered
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<BoundingBox>, bool) {
        (self.texts, self.boxes, self.goal_filtered)
    }
}

/// Reads text regions from a BGR screenshot
#[cfg_attr(test, mockall::automock)]
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &BgrImage) -> Result<OcrOutput>;
}

/// Guesses the language of a piece of text
#[cfg_attr(test, mockall::automock)]
pub trait LanguageDetector: Send + Sync {
    /// Language code, or `None` when the text is empty or ambiguous
    fn detect(&self, text: &str) -> Option<String>;
}

/// Kind of a labeled element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Text,
    Icon,
}

/// Position of a numbered element, as ratios of the image size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelCoordinate {
    pub id: usize,
    pub kind: ElementKind,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl LabelCoordinate {
    pub fn from_ratio_box(id: usize, kind: ElementKind, bbox: &BoundingBox) -> Self {
        Self {
            id,
            kind,
            x: bbox.x1,
            y: bbox.y1,
            width: bbox.width(),
            height: bbox.height(),
        }
    }
}

/// Input for one detection + captioning call
#[derive(Debug, Clone)]
pub struct LabelRequest<'a> {
    pub image: &'a BgrImage,
    pub box_threshold: f32,
    pub iou_threshold: f32,
    pub ocr_boxes: &'a [BoundingBox],
    pub ocr_texts: &'a [String],
    pub draw_config: DrawBoxConfig,
    pub cancel: &'a CancellationToken,
}

/// Result of labeling a screenshot
#[derive(Debug, Clone, Default)]
pub struct LabeledScreen {
    /// Annotated screenshot, PNG encoded as base64
    pub annotated_image_base64: String,
    /// One description per element, text elements first
    pub parsed_elements: Vec<String>,
    pub label_coordinates: Vec<LabelCoordinate>,
}

/// Detects GUI elements, captions them and draws the numbered overlay
pub trait ElementLabeler: Send + Sync {
    fn label(&self, request: &LabelRequest<'_>) -> Result<LabeledScreen>;
}
