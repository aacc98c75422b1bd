//! # recall-core - visual memory for agent conversations
//!
//! `recall-core` keeps long agent conversations within budget by turning old
//! turns into pictures. Text is laid out on square pages, rasterized,
//! compressed into a few hundred visual tokens and cached; the transcript
//! keeps only a short placeholder that can be expanded on demand.
//!
//! ## Highlights
//!
//! - **Layout and rendering**: width-aware wrapping, pagination and light
//!   syntax coloring onto PNG pages.
//! - **Compression**: a deterministic simulator plus a remote OCR service
//!   reached over stdio JSON-RPC, with retries and automatic fallback.
//! - **Token cache**: LRU store bounded by entry count and estimated size,
//!   persisted as JSON between runs.
//! - **Compaction policy**: picks old, non-user blocks outside a safety
//!   buffer, compresses them and splices in placeholders.
//! - **Tools**: `CompressVisualMemory`, `DecompressVisualMemory` and
//!   `GetVisualMemoryStats` for the agent.
//!
//! ## Architecture Overview
//!
//! - `config/`: `~/.recall/config.json` loading, defaults and constants.
//! - `visual/`: layout, highlighting, fonts, rendering and the token cache.
//! - `compression/`: simulator, remote invoker, retry and the client.
//! - `core/`: conversation model, compaction policy and sessions.
//! - `tools/`: tool trait, registry and the visual memory tools.
//!
//! ## Quickstart
//!
//! ```rust,ignore
//! use recall_core::{ConfigManager, Message, VisualMemorySession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), anyhow::Error> {
//!     let manager = ConfigManager::load()?;
//!     let mut session = VisualMemorySession::open(&manager);
//!
//!     session.add_message(Message::user("Refactor the parser"));
//!     // ... many turns later
//!     let report = session.run_garbage_collection().await;
//!     println!("compressed {} blocks", report.blocks_compressed);
//!     Ok(())
//! }
//! ```

pub mod compression;
pub mod config;
pub mod core;
pub mod tools;
pub mod visual;

pub use compression::{CompressionClient, CompressionMode, RemoteError, RemoteInvoker, RetryConfig};
pub use config::{ConfigManager, RenderConfig, VisualMemoryConfig};
pub use crate::core::{
    CompactionReport, ConversationContext, Message, MessageRole, Retrieval, VisualCompactor,
    VisualMemorySession,
};
pub use tools::{Tool, ToolRegistry};
pub use visual::{
    CompressionStats, ConversationRenderer, RenderedImage, VisualCache, VisualMemory,
    VisualTokens,
};
