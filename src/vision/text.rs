// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR text normalization and language detection

use whatlang::{Detector, Lang};

use crate::pipeline::LanguageDetector;

/// Normalize one OCR string
///
/// Drops control characters, collapses whitespace runs into a single space
/// and trims both ends.
pub fn post_process_text(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Statistical language detector backed by `whatlang`
#[derive(Debug, Default)]
pub struct WhatlangDetector {
    detector: Detector,
}

impl WhatlangDetector {
    pub fn new() -> Self {
        Self {
            detector: Detector::new(),
        }
    }
}

/// Language code for a detected language
///
/// Selectable languages map to their two-letter codes, everything else
/// keeps whatlang's three-letter code.
pub fn language_code(lang: Lang) -> String {
    match lang {
        Lang::Eng => "en".to_string(),
        Lang::Spa => "es".to_string(),
        Lang::Fra => "fr".to_string(),
        Lang::Deu => "de".to_string(),
        Lang::Cmn => "zh".to_string(),
        other => other.code().to_string(),
    }
}

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }
        let info = self.detector.detect(text)?;
        if !info.is_reliable() {
            return None;
        }
        Some(language_code(info.lang()))
    }
}
