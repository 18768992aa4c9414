// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Effective language resolution

use super::support::*;
use mockall::predicate::eq;
use screen_parser::config::DrawBoxConfig;
use screen_parser::pipeline::{
    LanguageSelector, OcrOutput, ParseRequest, ScreenParsingPipeline,
};
use screen_parser::vision::BoundingBox;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn ocr_with(texts: &'static [&'static str]) -> MockOcr {
    let mut ocr = MockOcr::new();
    ocr.expect_recognize().returning(move |_| {
        Ok(OcrOutput::from_regions(texts.iter().enumerate().map(|(i, t)| {
            let y = 4.0 + i as f32 * 10.0;
            (t.to_string(), BoundingBox::new(2.0, y, 40.0, y + 8.0))
        })))
    });
    ocr
}

fn pipeline(ocr: MockOcr, language: MockLanguage) -> (ScreenParsingPipeline, Arc<RecordingLabeler>) {
    let labeler = Arc::new(RecordingLabeler::default());
    let pipeline = ScreenParsingPipeline::new(
        Arc::new(ocr),
        Arc::new(language),
        labeler.clone(),
        DrawBoxConfig::PC,
    );
    (pipeline, labeler)
}

#[tokio::test]
async fn test_auto_without_text_defaults_to_english() {
    let mut language = MockLanguage::new();
    language
        .expect_detect()
        .with(eq(""))
        .times(1)
        .returning(|_| None);

    let (pipeline, _) = pipeline(ocr_with(&[]), language);
    let output = pipeline
        .process(&ParseRequest::new(blank_screen()), &CancellationToken::new())
        .unwrap();

    assert_eq!(output.effective_language, "en");
    assert!(output.parsed_elements.is_empty());
    assert!(output.parsed_text.is_empty());
}

#[tokio::test]
async fn test_auto_uses_detected_language() {
    let mut language = MockLanguage::new();
    language
        .expect_detect()
        .with(eq("Archivo Editar Ver"))
        .times(1)
        .returning(|_| Some("es".to_string()));

    let (pipeline, _) = pipeline(ocr_with(&["Archivo", "Editar", "Ver"]), language);
    let output = pipeline
        .process(&ParseRequest::new(blank_screen()), &CancellationToken::new())
        .unwrap();

    assert_eq!(output.effective_language, "es");
}

#[tokio::test]
async fn test_explicit_language_skips_detection() {
    for selector in [
        LanguageSelector::En,
        LanguageSelector::Es,
        LanguageSelector::Fr,
        LanguageSelector::De,
        LanguageSelector::Zh,
    ] {
        let mut language = MockLanguage::new();
        language.expect_detect().times(0);

        let (pipeline, _) = pipeline(ocr_with(&["Datei"]), language);
        let output = pipeline
            .process(
                &ParseRequest::new(blank_screen()).with_language(selector),
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(output.effective_language, selector.as_str());
    }
}

#[tokio::test]
async fn test_effective_language_not_forwarded_to_labeler() {
    let mut seen = Vec::new();

    for selector in [LanguageSelector::En, LanguageSelector::Zh, LanguageSelector::Auto] {
        let mut language = MockLanguage::new();
        language.expect_detect().returning(|_| Some("de".to_string()));

        let (pipeline, labeler) = pipeline(ocr_with(&["Speichern", "Abbrechen"]), language);
        pipeline
            .process(
                &ParseRequest::new(blank_screen()).with_language(selector),
                &CancellationToken::new(),
            )
            .unwrap();

        let calls = labeler.calls();
        assert_eq!(calls.len(), 1);
        seen.push(calls[0].clone());
    }

    // The labeler input is identical whatever language the request resolved to
    assert!(seen.windows(2).all(|pair| pair[0] == pair[1]));
}

#[tokio::test]
async fn test_texts_normalized_before_labeling() {
    let mut language = MockLanguage::new();
    language.expect_detect().returning(|_| None);

    let (pipeline, labeler) = pipeline(ocr_with(&["  Save\tAs ", "Open\u{0007}"]), language);
    let output = pipeline
        .process(&ParseRequest::new(blank_screen()), &CancellationToken::new())
        .unwrap();

    let call = &labeler.calls()[0];
    assert_eq!(call.ocr_texts, vec!["Save As", "Open"]);
    assert_eq!(call.ocr_texts.len(), call.ocr_boxes.len());
    assert_eq!(output.parsed_elements[0], "Text Box ID 0: Save As");
}

#[tokio::test]
async fn test_custom_normalizer_runs_per_element() {
    let mut language = MockLanguage::new();
    language.expect_detect().returning(|_| None);

    let (pipeline, labeler) = pipeline(ocr_with(&["save", "open", "close"]), language);
    let pipeline = pipeline.with_normalizer(|text| text.to_uppercase());
    pipeline
        .process(&ParseRequest::new(blank_screen()), &CancellationToken::new())
        .unwrap();

    assert_eq!(labeler.calls()[0].ocr_texts, vec!["SAVE", "OPEN", "CLOSE"]);
}
