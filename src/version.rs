// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the Screen Parser

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-screen-parser-2026-10-16";

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Build date
pub const BUILD_DATE: &str = "2026-10-16";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "paddleocr",
    "icon-detection",
    "florence-2-captions",
    "set-of-marks",
    "language-detection",
    "multipart-upload",
    "cuda-fp16",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Screen Parser {} ({})", VERSION_NUMBER, BUILD_DATE)
}
