//! Rendering conversation text to images and caching the resulting tokens
//!
//! - [`layout`] wraps and paginates text onto square pages
//! - [`highlighter`] colors code lines
//! - [`renderer`] rasterizes pages to encoded images
//! - [`cache`] keeps compressed memories in a bounded LRU store

pub mod cache;
pub mod fonts;
pub mod highlighter;
pub mod layout;
pub mod models;
pub mod renderer;

pub use cache::{CacheError, CacheStats, VisualCache, cache_key};
pub use fonts::FontHandle;
pub use highlighter::{Language, SyntaxHighlighter, TokenClass};
pub use layout::{Line, Page, SquareLayoutEngine};
pub use models::{CompressionStats, RenderedImage, VisualMemory, VisualToken, VisualTokens};
pub use renderer::{ConversationRenderer, PageRenderer, create_renderer};
