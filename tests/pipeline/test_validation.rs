// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Argument validation happens before any collaborator runs

use super::support::*;
use image::RgbImage;
use screen_parser::config::DrawBoxConfig;
use screen_parser::pipeline::{ParseRequest, ScreenParsingPipeline, Stage};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn untouched_pipeline() -> (ScreenParsingPipeline, Arc<RecordingLabeler>) {
    let mut ocr = MockOcr::new();
    ocr.expect_recognize().times(0);
    let mut language = MockLanguage::new();
    language.expect_detect().times(0);
    let labeler = Arc::new(RecordingLabeler::default());

    let pipeline = ScreenParsingPipeline::new(
        Arc::new(ocr),
        Arc::new(language),
        labeler.clone(),
        DrawBoxConfig::WEB,
    );
    (pipeline, labeler)
}

#[tokio::test]
async fn test_out_of_range_thresholds_rejected() {
    let cases = [
        (0.0, 0.1, "box_threshold"),
        (1.5, 0.1, "box_threshold"),
        (-0.2, 0.1, "box_threshold"),
        (f32::NAN, 0.1, "box_threshold"),
        (0.05, 0.0, "iou_threshold"),
        (0.05, 1.01, "iou_threshold"),
    ];

    for (box_threshold, iou_threshold, field) in cases {
        let (pipeline, labeler) = untouched_pipeline();
        let request = ParseRequest::new(blank_screen())
            .with_box_threshold(box_threshold)
            .with_iou_threshold(iou_threshold);

        let err = pipeline
            .process_async(request, CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_invalid_argument(), "{box_threshold}/{iou_threshold}");
        assert!(err.to_string().contains(field));
        assert_eq!(err.failed_stage(), Some(Stage::Validation));
        assert!(labeler.calls().is_empty());
    }
}

#[tokio::test]
async fn test_upper_bound_is_inclusive() {
    let mut ocr = MockOcr::new();
    ocr.expect_recognize()
        .times(1)
        .returning(|_| Ok(screen_parser::pipeline::OcrOutput::empty()));
    let mut language = MockLanguage::new();
    language.expect_detect().returning(|_| None);
    let labeler = Arc::new(RecordingLabeler::default());

    let pipeline = ScreenParsingPipeline::new(
        Arc::new(ocr),
        Arc::new(language),
        labeler.clone(),
        DrawBoxConfig::PC,
    );
    let request = ParseRequest::new(blank_screen())
        .with_box_threshold(1.0)
        .with_iou_threshold(1.0);

    pipeline
        .process(&request, &CancellationToken::new())
        .unwrap();
    assert_eq!(labeler.calls()[0].box_threshold, 1.0);
    assert_eq!(labeler.calls()[0].iou_threshold, 1.0);
}

#[tokio::test]
async fn test_empty_image_rejected() {
    let (pipeline, _) = untouched_pipeline();
    let err = pipeline
        .process(&ParseRequest::new(RgbImage::new(0, 0)), &CancellationToken::new())
        .unwrap_err();
    assert!(err.is_invalid_argument());
}
