// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Cancellation of in-flight requests

use super::support::*;
use screen_parser::config::DrawBoxConfig;
use screen_parser::pipeline::{OcrOutput, ParseRequest, ScreenParsingPipeline, Stage};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_cancelled_before_start() {
    let mut ocr = MockOcr::new();
    ocr.expect_recognize().times(0);
    let labeler = Arc::new(RecordingLabeler::default());

    let pipeline = ScreenParsingPipeline::new(
        Arc::new(ocr),
        Arc::new(MockLanguage::new()),
        labeler.clone(),
        DrawBoxConfig::PC,
    );

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = pipeline
        .process_async(ParseRequest::new(blank_screen()), cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(labeler.calls().is_empty());
}

#[tokio::test]
async fn test_cancelled_during_labeling() {
    let mut ocr = MockOcr::new();
    ocr.expect_recognize().returning(|_| Ok(OcrOutput::empty()));
    let mut language = MockLanguage::new();
    language.expect_detect().returning(|_| None);

    let pipeline = ScreenParsingPipeline::new(
        Arc::new(ocr),
        Arc::new(language),
        Arc::new(StallingLabeler),
        DrawBoxConfig::PC,
    );

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        pipeline.process_async(ParseRequest::new(blank_screen()), cancel),
    )
    .await
    .expect("cancellation should end the request")
    .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(err.failed_stage(), Some(Stage::Labeling));
}

#[tokio::test]
async fn test_blocking_cancel_reports_labeling_stage() {
    let mut ocr = MockOcr::new();
    ocr.expect_recognize().returning(|_| Ok(OcrOutput::empty()));
    let mut language = MockLanguage::new();
    language.expect_detect().returning(|_| None);

    let pipeline = ScreenParsingPipeline::new(
        Arc::new(ocr),
        Arc::new(language),
        Arc::new(StallingLabeler),
        DrawBoxConfig::PC,
    );

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let worker = std::thread::spawn(move || {
        pipeline.process(&ParseRequest::new(blank_screen()), &cancel)
    });
    std::thread::sleep(Duration::from_millis(50));
    trigger.cancel();

    let err = worker.join().unwrap().unwrap_err();
    assert!(matches!(
        err,
        screen_parser::pipeline::PipelineError::Cancelled {
            stage: Stage::Labeling
        }
    ));
}
