// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Numbered box overlay for the annotated screenshot

use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::DrawBoxConfig;
use crate::vision::geometry::BoundingBox;

/// Places searched when no font is configured
const SYSTEM_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Box colors, picked by element ID
const PALETTE: &[[u8; 3]] = &[
    [255, 0, 0],
    [0, 160, 0],
    [0, 0, 255],
    [255, 140, 0],
    [148, 0, 211],
    [0, 170, 170],
    [220, 20, 140],
    [128, 128, 0],
    [70, 130, 180],
    [139, 69, 19],
];

/// Font used for ID tags
///
/// The built-in 8x8 bitmap font covers every ID, so tags are always drawn
/// even on hosts without TrueType fonts.
#[derive(Clone, Default)]
pub enum LabelFont {
    TrueType { font: Arc<FontVec>, path: PathBuf },
    #[default]
    Bitmap,
}

impl std::fmt::Debug for LabelFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelFont::TrueType { path, .. } => {
                f.debug_struct("TrueType").field("path", path).finish()
            }
            LabelFont::Bitmap => f.write_str("Bitmap"),
        }
    }
}

impl LabelFont {
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read font: {}", path.display()))?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| anyhow::anyhow!("Invalid font {}: {}", path.display(), e))?;
        Ok(LabelFont::TrueType {
            font: Arc::new(font),
            path: path.to_path_buf(),
        })
    }

    /// Load the configured font, then well-known system fonts, then the bitmap font
    pub fn discover(configured: Option<&Path>) -> Self {
        if let Some(path) = configured {
            match Self::from_file(path) {
                Ok(font) => {
                    info!("Using label font {}", path.display());
                    return font;
                }
                Err(e) => warn!("⚠️ Could not load label font: {:#}", e),
            }
        }

        let found = SYSTEM_FONT_PATHS
            .iter()
            .map(Path::new)
            .filter(|path| path.exists())
            .find_map(|path| Self::from_file(path).ok());

        match found {
            Some(font) => {
                if let Some(path) = font.path() {
                    info!("Using label font {}", path.display());
                }
                font
            }
            None => {
                info!("No TrueType label font found, using built-in bitmap font");
                LabelFont::Bitmap
            }
        }
    }

    /// Source file, `None` for the built-in font
    pub fn path(&self) -> Option<&Path> {
        match self {
            LabelFont::TrueType { path, .. } => Some(path.as_path()),
            LabelFont::Bitmap => None,
        }
    }

    /// Rendered size of `text` at `glyph_px`
    fn measure(&self, text: &str, glyph_px: f32) -> (u32, u32) {
        match self {
            LabelFont::TrueType { font, .. } => {
                text_size(PxScale::from(glyph_px), font.as_ref(), text)
            }
            LabelFont::Bitmap => {
                let cell = BITMAP_GLYPH_SIZE * bitmap_scale(glyph_px);
                (cell * text.chars().count() as u32, cell)
            }
        }
    }

    fn draw(&self, image: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, glyph_px: f32, text: &str) {
        match self {
            LabelFont::TrueType { font, .. } => {
                draw_text_mut(image, color, x, y, PxScale::from(glyph_px), font.as_ref(), text)
            }
            LabelFont::Bitmap => draw_bitmap_text(image, color, x, y, bitmap_scale(glyph_px), text),
        }
    }
}

const BITMAP_GLYPH_SIZE: u32 = 8;

/// Integer upscale of the 8px bitmap glyphs closest to `glyph_px`
fn bitmap_scale(glyph_px: f32) -> u32 {
    ((glyph_px / BITMAP_GLYPH_SIZE as f32).round() as u32).max(1)
}

fn draw_bitmap_text(image: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, scale: u32, text: &str) {
    let (width, height) = (image.width() as i32, image.height() as i32);
    let scale = scale as i32;
    let cell = BITMAP_GLYPH_SIZE as i32 * scale;

    for (index, ch) in text.chars().enumerate() {
        let Some(glyph) = BASIC_FONTS.get(ch).or_else(|| BASIC_FONTS.get('?')) else {
            continue;
        };
        let origin_x = x + index as i32 * cell;
        for (row, &bits) in glyph.iter().enumerate() {
            for col in 0..BITMAP_GLYPH_SIZE as i32 {
                if (bits >> col) & 1 == 0 {
                    continue;
                }
                let px = origin_x + col * scale;
                let py = y + row as i32 * scale;
                for dy in 0..scale {
                    for dx in 0..scale {
                        let (tx, ty) = (px + dx, py + dy);
                        if tx >= 0 && ty >= 0 && tx < width && ty < height {
                            image.put_pixel(tx as u32, ty as u32, color);
                        }
                    }
                }
            }
        }
    }
}

/// Draws element boxes and their ID tags
#[derive(Debug, Clone, Default)]
pub struct BoxAnnotator {
    font: LabelFont,
}

impl BoxAnnotator {
    pub fn new(font: LabelFont) -> Self {
        Self { font }
    }

    /// Draw `(id, box)` pairs given in pixel coordinates
    pub fn annotate(
        &self,
        image: &mut RgbImage,
        elements: &[(usize, BoundingBox)],
        config: &DrawBoxConfig,
    ) {
        let (width, height) = image.dimensions();
        for (id, bbox) in elements {
            let bbox = bbox.clamp(width as f32, height as f32);
            if !bbox.is_valid() {
                continue;
            }
            let color = box_color(*id);
            draw_box(image, &bbox, color, config.thickness);
            draw_tag(image, &self.font, *id, &bbox, color, config);
        }
    }
}

pub fn box_color(id: usize) -> Rgb<u8> {
    Rgb(PALETTE[id % PALETTE.len()])
}

/// Black or white, whichever reads better on `background`
pub fn text_color(background: Rgb<u8>) -> Rgb<u8> {
    let [r, g, b] = background.0;
    let luminance = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    if luminance > 160.0 {
        Rgb([0, 0, 0])
    } else {
        Rgb([255, 255, 255])
    }
}

/// Outline drawn inward so thick strokes stay inside the box
fn draw_box(image: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>, thickness: u32) {
    let x = bbox.x1.round() as i32;
    let y = bbox.y1.round() as i32;
    let w = bbox.width().round() as i32;
    let h = bbox.height().round() as i32;

    for offset in 0..thickness.max(1) as i32 {
        let (rw, rh) = (w - 2 * offset, h - 2 * offset);
        if rw <= 0 || rh <= 0 {
            break;
        }
        let rect = Rect::at(x + offset, y + offset).of_size(rw as u32, rh as u32);
        draw_hollow_rect_mut(image, rect, color);
    }
}

/// Filled ID tag above the box, or inside it when there is no room above
fn draw_tag(
    image: &mut RgbImage,
    font: &LabelFont,
    id: usize,
    bbox: &BoundingBox,
    color: Rgb<u8>,
    config: &DrawBoxConfig,
) {
    let label = id.to_string();
    let glyph_px = config.glyph_px();
    let (text_w, text_h) = font.measure(&label, glyph_px);

    let padding = config.text_padding;
    let tag_w = text_w + 2 * padding + config.text_thickness.saturating_sub(1);
    let tag_h = text_h + 2 * padding;

    let x = bbox.x1.round() as i32;
    let above = bbox.y1.round() as i32 - tag_h as i32;
    let y = if above >= 0 { above } else { bbox.y1.round() as i32 };

    draw_filled_rect_mut(image, Rect::at(x, y).of_size(tag_w.max(1), tag_h.max(1)), color);

    let foreground = text_color(color);
    for stroke in 0..config.text_thickness.max(1) as i32 {
        font.draw(
            image,
            foreground,
            x + padding as i32 + stroke,
            y + padding as i32,
            glyph_px,
            &label,
        );
    }
}
