// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! End-to-end parsing through the real set-of-marks labeler

use super::support::*;
use screen_parser::config::DrawBoxConfig;
use screen_parser::pipeline::{LanguageSelector, OcrOutput, ParseRequest, ScreenParsingPipeline};
use screen_parser::vision::detector::Detection;
use screen_parser::vision::som::{BoxAnnotator, SomLabeler};
use screen_parser::vision::BoundingBox;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn pipeline_with(
    ocr: MockOcr,
    language: MockLanguage,
    icons: MockIcons,
    captioner: MockCaptioner,
) -> ScreenParsingPipeline {
    let labeler = SomLabeler::new(
        Arc::new(icons),
        Arc::new(captioner),
        BoxAnnotator::default(),
    );
    ScreenParsingPipeline::new(
        Arc::new(ocr),
        Arc::new(language),
        Arc::new(labeler),
        DrawBoxConfig::PC,
    )
}

#[tokio::test]
async fn test_ok_button_end_to_end() {
    let (image, button) = ok_button_screen();
    let label = BoundingBox::new(145.0, 110.0, 175.0, 130.0);

    let mut ocr = MockOcr::new();
    ocr.expect_recognize()
        .times(1)
        .returning(move |_| Ok(OcrOutput::from_regions(vec![("OK".to_string(), label)])));

    let mut language = MockLanguage::new();
    language.expect_detect().times(0);

    let mut icons = MockIcons::new();
    icons
        .expect_detect()
        .withf(|_, threshold| (*threshold - 0.05).abs() < f32::EPSILON)
        .times(1)
        .returning(move |_, _| {
            Ok(vec![
                Detection {
                    bbox: button,
                    confidence: 0.92,
                },
                Detection {
                    bbox: BoundingBox::new(10.0, 10.0, 40.0, 40.0),
                    confidence: 0.4,
                },
            ])
        });

    let mut captioner = MockCaptioner::new();
    captioner
        .expect_caption()
        .times(1)
        .returning(|_, _| Ok("close window".to_string()));

    let pipeline = pipeline_with(ocr, language, icons, captioner);
    let request = ParseRequest::new(image.clone())
        .with_box_threshold(0.05)
        .with_iou_threshold(0.1)
        .with_language(LanguageSelector::En);

    let output = pipeline
        .process_async(request, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(output.annotated_image.dimensions(), image.dimensions());
    assert_ne!(output.annotated_image, image);
    assert_eq!(output.effective_language, "en");
    assert!(output.parsed_text.lines().any(|line| line.contains("OK")));

    // The button box overlaps the OCR label and is removed; the corner icon survives
    assert_eq!(
        output.parsed_elements,
        vec!["Text Box ID 0: OK", "Icon Box ID 1: close window"]
    );
    let non_empty = output.parsed_text.lines().filter(|l| !l.is_empty()).count();
    assert_eq!(non_empty, output.parsed_elements.len());
    assert_eq!(output.label_coordinates.len(), output.parsed_elements.len());
}

#[tokio::test]
async fn test_line_count_matches_elements_with_multiline_captions() {
    let mut ocr = MockOcr::new();
    ocr.expect_recognize().returning(|_| {
        Ok(OcrOutput::from_regions(vec![
            ("File".to_string(), BoundingBox::new(2.0, 2.0, 20.0, 10.0)),
            ("Edit".to_string(), BoundingBox::new(24.0, 2.0, 40.0, 10.0)),
        ]))
    });

    let mut language = MockLanguage::new();
    language.expect_detect().returning(|_| None);

    let mut icons = MockIcons::new();
    icons.expect_detect().returning(|_, _| {
        Ok(vec![Detection {
            bbox: BoundingBox::new(40.0, 30.0, 60.0, 46.0),
            confidence: 0.7,
        }])
    });

    let mut captioner = MockCaptioner::new();
    captioner
        .expect_caption()
        .returning(|_, _| Ok("a gear\nicon".to_string()));

    let pipeline = pipeline_with(ocr, language, icons, captioner);
    let output = pipeline
        .process(&ParseRequest::new(blank_screen()), &CancellationToken::new())
        .unwrap();

    assert_eq!(output.parsed_elements.len(), 3);
    assert_eq!(output.parsed_text.lines().count(), 3);
    assert_eq!(output.effective_language, "en");
}

#[tokio::test]
async fn test_detector_failure_is_labeling_error() {
    let mut ocr = MockOcr::new();
    ocr.expect_recognize().returning(|_| Ok(OcrOutput::empty()));
    let mut language = MockLanguage::new();
    language.expect_detect().returning(|_| None);

    let mut icons = MockIcons::new();
    icons
        .expect_detect()
        .returning(|_, _| Err(anyhow::anyhow!("CUDA out of memory")));

    let pipeline = pipeline_with(ocr, language, icons, MockCaptioner::new());
    let err = pipeline
        .process(&ParseRequest::new(blank_screen()), &CancellationToken::new())
        .unwrap_err();

    assert!(err.is_detection_error());
    assert!(format!("{:#}", anyhow::Error::from(err)).contains("CUDA out of memory"));
}

#[tokio::test]
async fn test_ocr_failure_skips_labeling() {
    let mut ocr = MockOcr::new();
    ocr.expect_recognize()
        .returning(|_| Err(anyhow::anyhow!("model returned NaN")));
    let mut language = MockLanguage::new();
    language.expect_detect().times(0);
    let mut icons = MockIcons::new();
    icons.expect_detect().times(0);

    let pipeline = pipeline_with(ocr, language, icons, MockCaptioner::new());
    let err = pipeline
        .process(&ParseRequest::new(blank_screen()), &CancellationToken::new())
        .unwrap_err();

    assert!(err.is_ocr_error());
}

fn recording_pipeline(ocr: MockOcr) -> (ScreenParsingPipeline, Arc<RecordingLabeler>) {
    let mut language = MockLanguage::new();
    language.expect_detect().returning(|_| None);
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
async fn test_collaborators_receive_bgr_pixels() {
    let mut ocr = MockOcr::new();
    ocr.expect_recognize()
        .withf(|image| first_pixel(image) == [0, 0, 255])
        .times(1)
        .returning(|_| Ok(OcrOutput::empty()));

    let (pipeline, labeler) = recording_pipeline(ocr);
    let output = pipeline
        .process(&ParseRequest::new(red_screen()), &CancellationToken::new())
        .unwrap();

    assert_eq!(labeler.calls()[0].first_pixel, [0, 0, 255]);
    // Returned image is RGB again
    assert_eq!(output.annotated_image.get_pixel(0, 0).0, [255, 0, 0]);
}

#[tokio::test]
async fn test_large_noisy_screen_keeps_annotated_image() {
    let mut ocr = MockOcr::new();
    ocr.expect_recognize().returning(|_| Ok(OcrOutput::empty()));

    let (pipeline, _) = recording_pipeline(ocr);
    let output = pipeline
        .process(&ParseRequest::new(noisy_screen(2800)), &CancellationToken::new())
        .unwrap();

    assert_eq!(output.annotated_image.dimensions(), (2800, 2800));
    assert!(output.parsed_text.is_empty());
}
