//! Font resolution and glyph drawing
//!
//! A TrueType face is looked up through a fallback chain of common
//! monospace fonts. When none can be read, an embedded 8x8 bitmap font is
//! used so rendering never fails for lack of a font.

use ab_glyph::{Font, FontArc, PxScale, ScaleFont, point};
use font8x8::UnicodeFonts;
use image::RgbImage;
use std::path::PathBuf;
use tracing::debug;

use crate::config::Rgb;

const BITMAP_CELL: u32 = 8;

const SYSTEM_FALLBACKS: &[&str] = &[
    "/usr/share/fonts/truetype/jetbrains-mono/JetBrainsMono-Regular.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    "/usr/share/fonts/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationMono-Regular.ttf",
    "/System/Library/Fonts/Menlo.ttc",
    "/Library/Fonts/Courier New.ttf",
    "C:\\Windows\\Fonts\\consola.ttf",
    "C:\\Windows\\Fonts\\cour.ttf",
];

#[derive(Clone)]
enum GlyphSource {
    Outline(FontArc),
    Bitmap,
}

/// A resolved font at a fixed pixel size
#[derive(Clone)]
pub struct FontHandle {
    source: GlyphSource,
    name: String,
    px_size: f32,
    max_advance: Option<u32>,
}

impl std::fmt::Debug for FontHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontHandle")
            .field("name", &self.name)
            .field("px_size", &self.px_size)
            .field("max_advance", &self.max_advance)
            .finish()
    }
}

impl FontHandle {
    /// Resolve `family` through the fallback chain at `size` pixels
    pub fn load(family: &str, size: u32) -> Self {
        for path in candidate_paths(family) {
            let Ok(bytes) = std::fs::read(&path) else {
                continue;
            };
            match FontArc::try_from_vec(bytes) {
                Ok(font) => {
                    debug!(font = %path.display(), size, "loaded font");
                    return Self {
                        source: GlyphSource::Outline(font),
                        name: path
                            .file_name()
                            .map(|name| name.to_string_lossy().into_owned())
                            .unwrap_or_else(|| family.to_string()),
                        px_size: size as f32,
                        max_advance: None,
                    };
                }
                Err(err) => debug!(font = %path.display(), error = %err, "unusable font file"),
            }
        }

        debug!(family, "no outline font found, using builtin bitmap font");
        Self::builtin(size)
    }

    /// The embedded bitmap font
    pub fn builtin(size: u32) -> Self {
        Self {
            source: GlyphSource::Bitmap,
            name: "builtin-8x8".to_string(),
            px_size: size as f32,
            max_advance: None,
        }
    }

    /// Same face at another pixel size
    pub fn resized(&self, size: u32) -> Self {
        Self {
            source: self.source.clone(),
            name: self.name.clone(),
            px_size: size as f32,
            max_advance: self.max_advance,
        }
    }

    /// Keep every glyph advance within `limit` pixels
    ///
    /// Outline faces are scaled down until a full-width glyph fits; the
    /// bitmap font is squeezed horizontally into the narrower cell.
    pub fn fit_advance(mut self, limit: u32) -> Self {
        let limit = limit.max(1);
        if let GlyphSource::Outline(font) = &self.source {
            let scaled = font.as_scaled(PxScale::from(self.px_size));
            let advance = scaled.h_advance(scaled.glyph_id('M'));
            if advance > limit as f32 {
                self.px_size *= limit as f32 / advance;
            }
        }
        self.max_advance = Some(limit);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.source, GlyphSource::Bitmap)
    }

    fn bitmap_scale(&self) -> u32 {
        ((self.px_size / BITMAP_CELL as f32).round() as u32).max(1)
    }

    fn bitmap_advance(&self) -> u32 {
        let cell = BITMAP_CELL * self.bitmap_scale();
        self.max_advance.map_or(cell, |limit| limit.min(cell))
    }

    /// Rendered size of `text` in pixels (width, height)
    pub fn measure(&self, text: &str) -> (u32, u32) {
        match &self.source {
            GlyphSource::Outline(font) => {
                let scaled = font.as_scaled(PxScale::from(self.px_size));
                let mut width = 0.0f32;
                let mut previous = None;
                for ch in text.chars() {
                    let id = scaled.glyph_id(ch);
                    if let Some(prev) = previous {
                        width += scaled.kern(prev, id);
                    }
                    width += scaled.h_advance(id);
                    previous = Some(id);
                }
                (width.ceil() as u32, scaled.height().ceil() as u32)
            }
            GlyphSource::Bitmap => {
                let cell = BITMAP_CELL * self.bitmap_scale();
                (text.chars().count() as u32 * self.bitmap_advance(), cell)
            }
        }
    }

    /// Draw `text` with its top-left corner at `(x, y)`; returns the advance width
    pub fn draw(&self, canvas: &mut RgbImage, x: u32, y: u32, text: &str, color: Rgb) -> u32 {
        match &self.source {
            GlyphSource::Outline(font) => {
                draw_outline(font, self.px_size, canvas, x, y, text, color)
            }
            GlyphSource::Bitmap => {
                let cell = BitmapCell {
                    scale: self.bitmap_scale(),
                    advance: self.bitmap_advance(),
                };
                draw_bitmap(cell, canvas, x, y, text, color)
            }
        }
    }
}

fn candidate_paths(family: &str) -> Vec<PathBuf> {
    let compact: String = family.chars().filter(|c| !c.is_whitespace()).collect();
    let file_names = [
        format!("{compact}-Regular.ttf"),
        format!("{compact}NL-Regular.ttf"),
        format!("{compact}.ttf"),
    ];

    let mut dirs_to_search: Vec<PathBuf> = Vec::new();
    if let Some(home) = dirs::home_dir() {
        dirs_to_search.push(home.join(".fonts"));
        dirs_to_search.push(home.join(".local/share/fonts"));
        dirs_to_search.push(home.join("Library/Fonts"));
    }
    if let Some(font_dir) = dirs::font_dir() {
        dirs_to_search.push(font_dir);
    }
    dirs_to_search.push(PathBuf::from("/usr/share/fonts/truetype"));
    dirs_to_search.push(PathBuf::from("/usr/share/fonts/TTF"));
    dirs_to_search.push(PathBuf::from("/Library/Fonts"));

    let mut candidates: Vec<PathBuf> = file_names.iter().map(PathBuf::from).collect();
    for dir in &dirs_to_search {
        for name in &file_names {
            candidates.push(dir.join(name));
        }
    }
    candidates.extend(SYSTEM_FALLBACKS.iter().map(PathBuf::from));
    candidates
}

fn blend(canvas: &mut RgbImage, x: i64, y: i64, color: Rgb, coverage: f32) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }
    let coverage = coverage.clamp(0.0, 1.0);
    let pixel = canvas.get_pixel_mut(x as u32, y as u32);
    for (channel, target) in pixel.0.iter_mut().zip(color) {
        let mixed = *channel as f32 * (1.0 - coverage) + target as f32 * coverage;
        *channel = mixed.round() as u8;
    }
}

fn draw_outline(
    font: &FontArc,
    px_size: f32,
    canvas: &mut RgbImage,
    x: u32,
    y: u32,
    text: &str,
    color: Rgb,
) -> u32 {
    let scale = PxScale::from(px_size);
    let scaled = font.as_scaled(scale);
    let baseline = y as f32 + scaled.ascent();
    let mut caret = x as f32;
    let mut previous = None;

    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(prev) = previous {
            caret += scaled.kern(prev, id);
        }
        let glyph = id.with_scale_and_position(scale, point(caret, baseline));
        caret += scaled.h_advance(id);
        previous = Some(id);

        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                blend(
                    canvas,
                    bounds.min.x as i64 + gx as i64,
                    bounds.min.y as i64 + gy as i64,
                    color,
                    coverage,
                );
            });
        }
    }

    (caret - x as f32).max(0.0).ceil() as u32
}

#[derive(Clone, Copy)]
struct BitmapCell {
    scale: u32,
    advance: u32,
}

fn draw_bitmap(
    cell: BitmapCell,
    canvas: &mut RgbImage,
    x: u32,
    y: u32,
    text: &str,
    color: Rgb,
) -> u32 {
    let BitmapCell { scale, advance } = cell;
    let width = BITMAP_CELL * scale;
    let mut caret = x;
    for ch in text.chars() {
        let glyph = font8x8::BASIC_FONTS
            .get(ch)
            .or_else(|| font8x8::LATIN_FONTS.get(ch))
            .or_else(|| font8x8::BASIC_FONTS.get('?'));
        if let Some(rows) = glyph {
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..8u32 {
                    if bits & (1 << col) == 0 {
                        continue;
                    }
                    for dy in 0..scale {
                        for dx in 0..scale {
                            // columns are remapped when the advance is narrower than the cell
                            let offset = (col * scale + dx) * advance / width;
                            blend(
                                canvas,
                                (caret + offset) as i64,
                                (y + row as u32 * scale + dy) as i64,
                                color,
                                1.0,
                            );
                        }
                    }
                }
            }
        }
        caret += advance;
    }
    caret - x
}
