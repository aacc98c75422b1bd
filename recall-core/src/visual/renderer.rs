//! Text to square page images

use crate::config::RenderConfig;
use crate::config::constants::render;
use crate::core::conversation::Message;
use crate::visual::fonts::FontHandle;
use crate::visual::highlighter::{Language, SyntaxHighlighter};
use crate::visual::layout::{Page, SquareLayoutEngine, is_code_line};
use crate::visual::models::RenderedImage;
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use serde_json::{Map, Value, json};
use std::io::Cursor;
use tracing::debug;

/// Turns a block of text into page images
pub trait PageRenderer: Send + Sync + std::fmt::Debug {
    fn render_pages(&self, text: &str, message_ids: &[String]) -> Result<Vec<RenderedImage>>;
}

/// Renders conversation text to one image per page
#[derive(Debug, Clone)]
pub struct ConversationRenderer {
    config: RenderConfig,
    layout: SquareLayoutEngine,
    highlighter: SyntaxHighlighter,
    font: FontHandle,
    footer_font: FontHandle,
}

impl Default for ConversationRenderer {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

impl ConversationRenderer {
    pub fn new(config: RenderConfig) -> Self {
        let font = FontHandle::load(&config.font_family, config.font_size);
        Self::with_font(config, font)
    }

    /// Build a renderer around an already resolved font
    pub fn with_font(config: RenderConfig, font: FontHandle) -> Self {
        let footer_size = config
            .font_size
            .saturating_sub(render::FOOTER_SIZE_REDUCTION)
            .max(render::FOOTER_MIN_FONT_SIZE);
        let layout = SquareLayoutEngine::new(config.clone());
        let font = font.fit_advance(layout.char_advance());
        let footer_font = font.resized(footer_size);
        Self {
            layout,
            highlighter: SyntaxHighlighter::new(),
            config,
            font,
            footer_font,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn layout_engine(&self) -> &SquareLayoutEngine {
        &self.layout
    }

    pub fn font_name(&self) -> &str {
        self.font.name()
    }

    /// Render `text` with highlighting taken from the config
    pub fn render(&self, text: &str, message_ids: &[String]) -> Result<Vec<RenderedImage>> {
        self.render_conversation(text, message_ids, None)
    }

    /// Render `text`, optionally forcing highlighting on or off
    pub fn render_conversation(
        &self,
        text: &str,
        message_ids: &[String],
        highlight: Option<bool>,
    ) -> Result<Vec<RenderedImage>> {
        let highlight = highlight.unwrap_or(self.config.enable_syntax_highlighting);
        let pages = self.layout.layout(text);
        debug!(chars = text.len(), pages = pages.len(), highlight, "rendering conversation");

        pages
            .iter()
            .map(|page| {
                let language = if highlight {
                    self.detect_page_language(page)
                } else {
                    None
                };
                let image_bytes = self.render_page(page, highlight, language)?;

                let mut metadata = Map::new();
                metadata.insert("page_number".into(), json!(page.page_number));
                metadata.insert("total_pages".into(), json!(page.total_pages));
                metadata.insert("font_family".into(), json!(self.config.font_family));
                metadata.insert("font_size".into(), json!(self.config.font_size));
                metadata.insert("font_source".into(), json!(self.font.name()));
                if let Some(language) = language {
                    metadata.insert("language".into(), json!(language.as_str()));
                }
                Ok(RenderedImage {
                    image_bytes,
                    message_ids: message_ids.to_vec(),
                    resolution: self.config.resolution,
                    format: self.config.image_format,
                    metadata,
                })
            })
            .collect()
    }

    /// Render messages as `[role]:` blocks separated by blank lines
    ///
    /// Message ids are the message positions.
    pub fn render_messages(&self, messages: &[Message]) -> Result<Vec<RenderedImage>> {
        let ids: Vec<String> = (0..messages.len()).map(|i| i.to_string()).collect();
        let text = messages
            .iter()
            .map(|message| format!("[{}]:\n{}\n", message.role.as_str(), message.content.as_text()))
            .collect::<Vec<_>>()
            .join("\n");
        self.render(&text, &ids)
    }

    fn detect_page_language(&self, page: &Page) -> Option<Language> {
        let page_text = page
            .lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.highlighter.detect_language(&page_text)
    }

    fn render_page(
        &self,
        page: &Page,
        highlight: bool,
        language: Option<Language>,
    ) -> Result<Vec<u8>> {
        let (width, height) = self.config.resolution;
        let mut canvas = RgbImage::from_pixel(width, height, Rgb(self.config.background_color));
        let x = self.config.padding;

        for line in &page.lines {
            if highlight && (line.is_code || self.highlighter.should_highlight(&line.text)) {
                let mut caret = x;
                for (run, class) in self.highlighter.highlight_line(&line.text, language) {
                    caret += self
                        .font
                        .draw(&mut canvas, caret, line.y_position, &run, class.color());
                }
            } else {
                self.font.draw(
                    &mut canvas,
                    x,
                    line.y_position,
                    &line.text,
                    self.config.text_color,
                );
            }
        }

        if page.total_pages > 1 {
            let footer = format!("Page {}/{}", page.page_number, page.total_pages);
            let (footer_width, footer_height) = self.footer_font.measure(&footer);
            let footer_x = width.saturating_sub(footer_width + self.config.padding);
            let footer_y = height.saturating_sub(footer_height + self.config.padding);
            self.footer_font
                .draw(&mut canvas, footer_x, footer_y, &footer, render::FOOTER_COLOR);
        }

        let mut bytes = Vec::new();
        canvas
            .write_to(&mut Cursor::new(&mut bytes), self.config.image_format.image_format())
            .with_context(|| {
                format!(
                    "Failed to encode page {} as {}",
                    page.page_number,
                    self.config.image_format.as_str()
                )
            })?;
        Ok(bytes)
    }

    /// Expected compression ratio from the share of code-like lines
    pub fn estimate_compression_ratio(&self, text: &str) -> f64 {
        if text.is_empty() {
            return 1.0;
        }
        let lines: Vec<&str> = text.split('\n').collect();
        let code_lines = lines.iter().filter(|line| is_code_line(line)).count();
        let code_ratio = code_lines as f64 / lines.len() as f64;

        if code_ratio > render::CODE_HEAVY_THRESHOLD {
            render::CODE_HEAVY_RATIO
        } else if code_ratio > render::MIXED_CONTENT_THRESHOLD {
            render::MIXED_CONTENT_RATIO
        } else {
            render::PLAIN_TEXT_RATIO
        }
    }
}

impl PageRenderer for ConversationRenderer {
    fn render_pages(&self, text: &str, message_ids: &[String]) -> Result<Vec<RenderedImage>> {
        self.render(text, message_ids)
    }
}

/// Renderer for a square page of `side` pixels
pub fn create_renderer(
    side: u32,
    font_size: u32,
    enable_highlighting: bool,
) -> ConversationRenderer {
    ConversationRenderer::new(RenderConfig {
        resolution: (side, side),
        font_size,
        enable_syntax_highlighting: enable_highlighting,
        ..RenderConfig::default()
    })
}
