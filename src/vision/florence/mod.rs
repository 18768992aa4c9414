// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Florence-2 icon captioning
//!
//! Components:
//! - `encoder` - Vision encoder for image feature extraction
//! - `decoder` - Language decoder for text generation
//! - `model` - Captioner combining both
//! - `preprocessing` - Image preprocessing for encoder input

pub mod decoder;
pub mod encoder;
pub mod model;
pub mod preprocessing;

pub use decoder::FlorenceDecoder;
pub use encoder::FlorenceEncoder;
pub use model::FlorenceCaptioner;
