// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Annotation draw-style presets per device class

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Class of device the screenshots come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    #[default]
    Pc,
    Web,
    Mobile,
}

impl DeviceClass {
    /// Draw style for this device class
    pub const fn draw_config(self) -> DrawBoxConfig {
        match self {
            DeviceClass::Pc => DrawBoxConfig::PC,
            DeviceClass::Web => DrawBoxConfig::WEB,
            DeviceClass::Mobile => DrawBoxConfig::MOBILE,
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceClass::Pc => write!(f, "pc"),
            DeviceClass::Web => write!(f, "web"),
            DeviceClass::Mobile => write!(f, "mobile"),
        }
    }
}

impl FromStr for DeviceClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pc" => Ok(DeviceClass::Pc),
            "web" => Ok(DeviceClass::Web),
            "mobile" => Ok(DeviceClass::Mobile),
            other => Err(format!(
                "unknown device class '{}', expected pc, web or mobile",
                other
            )),
        }
    }
}

/// Rendering parameters for element boxes and their ID tags
///
/// Only affects the annotated image, never detection or OCR.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawBoxConfig {
    /// Label text scale relative to the base glyph height
    pub text_scale: f32,
    /// Stroke passes used when rendering label text
    pub text_thickness: u32,
    /// Padding around label text inside its tag, in pixels
    pub text_padding: u32,
    /// Box outline thickness, in pixels
    pub thickness: u32,
}

impl DrawBoxConfig {
    pub const PC: DrawBoxConfig = DrawBoxConfig {
        text_scale: 0.8,
        text_thickness: 2,
        text_padding: 2,
        thickness: 2,
    };

    pub const WEB: DrawBoxConfig = DrawBoxConfig {
        text_scale: 0.8,
        text_thickness: 2,
        text_padding: 3,
        thickness: 3,
    };

    pub const MOBILE: DrawBoxConfig = DrawBoxConfig {
        text_scale: 0.8,
        text_thickness: 2,
        text_padding: 3,
        thickness: 3,
    };

    /// Base glyph height in pixels for `text_scale == 1.0`
    pub const BASE_GLYPH_PX: f32 = 28.0;

    /// Glyph height in pixels
    pub fn glyph_px(&self) -> f32 {
        (Self::BASE_GLYPH_PX * self.text_scale).max(6.0)
    }
}

impl Default for DrawBoxConfig {
    fn default() -> Self {
        DeviceClass::default().draw_config()
    }
}
