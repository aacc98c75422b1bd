use crate::config::constants::render;
use serde::{Deserialize, Serialize};

/// RGB triple used for page colors
pub type Rgb = [u8; 3];

/// Encoding used for rendered pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageFormat {
    #[default]
    Png,
    Bmp,
}

impl PageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageFormat::Png => "PNG",
            PageFormat::Bmp => "BMP",
        }
    }

    pub(crate) fn image_format(&self) -> image::ImageFormat {
        match self {
            PageFormat::Png => image::ImageFormat::Png,
            PageFormat::Bmp => image::ImageFormat::Bmp,
        }
    }
}

/// Page rendering parameters
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RenderConfig {
    /// Page size in pixels (width, height); square by default
    #[serde(default = "default_resolution")]
    pub resolution: (u32, u32),

    /// Preferred monospace font family, resolved through a fallback chain
    #[serde(default = "default_font_family")]
    pub font_family: String,

    /// Font size in pixels
    #[serde(default = "default_font_size")]
    pub font_size: u32,

    #[serde(default = "default_background_color")]
    pub background_color: Rgb,

    #[serde(default = "default_text_color")]
    pub text_color: Rgb,

    /// Extra pixels between consecutive lines
    #[serde(default = "default_line_spacing")]
    pub line_spacing: u32,

    /// Margin kept clear on every side of the page
    #[serde(default = "default_padding")]
    pub padding: u32,

    #[serde(default = "default_syntax_highlighting")]
    pub enable_syntax_highlighting: bool,

    #[serde(default = "default_max_lines_per_image")]
    pub max_lines_per_image: usize,

    #[serde(default)]
    pub image_format: PageFormat,
}

fn default_resolution() -> (u32, u32) {
    (render::DEFAULT_RESOLUTION, render::DEFAULT_RESOLUTION)
}
fn default_font_family() -> String {
    render::DEFAULT_FONT_FAMILY.to_string()
}
fn default_font_size() -> u32 {
    render::DEFAULT_FONT_SIZE
}
fn default_background_color() -> Rgb {
    render::DEFAULT_BACKGROUND_COLOR
}
fn default_text_color() -> Rgb {
    render::DEFAULT_TEXT_COLOR
}
fn default_line_spacing() -> u32 {
    render::DEFAULT_LINE_SPACING
}
fn default_padding() -> u32 {
    render::DEFAULT_PADDING
}
fn default_syntax_highlighting() -> bool {
    render::DEFAULT_SYNTAX_HIGHLIGHTING
}
fn default_max_lines_per_image() -> usize {
    render::DEFAULT_MAX_LINES_PER_IMAGE
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            font_family: default_font_family(),
            font_size: default_font_size(),
            background_color: default_background_color(),
            text_color: default_text_color(),
            line_spacing: default_line_spacing(),
            padding: default_padding(),
            enable_syntax_highlighting: default_syntax_highlighting(),
            max_lines_per_image: default_max_lines_per_image(),
            image_format: PageFormat::default(),
        }
    }
}

impl RenderConfig {
    /// Square page of the given side length, other fields at their defaults
    pub fn square(side: u32) -> Self {
        Self {
            resolution: (side, side),
            ..Self::default()
        }
    }

    /// Drawable width once padding is removed from both sides
    pub fn effective_width(&self) -> u32 {
        self.resolution.0.saturating_sub(self.padding * 2)
    }

    /// Drawable height once padding is removed from both sides
    pub fn effective_height(&self) -> u32 {
        self.resolution.1.saturating_sub(self.padding * 2)
    }

    /// Vertical distance between the tops of two consecutive lines
    pub fn line_height(&self) -> u32 {
        self.font_size + self.line_spacing
    }
}
