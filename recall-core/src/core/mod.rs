//! Conversation state and the policy that compresses old turns
//!
//! - [`conversation`] message model and per-session context
//! - [`visual_compaction`] block selection, compression and placeholders
//! - [`session`] wiring of cache, renderer and client for one conversation

pub mod conversation;
pub mod session;
pub mod visual_compaction;

pub use conversation::{
    CompressedMarker, ContentBlock, ConversationContext, Message, MessageContent, MessageRole,
    load_transcript, save_transcript,
};
pub use session::VisualMemorySession;
pub use visual_compaction::{
    CompactionPolicy, CompactionReport, CompressionError, CompressionOutcome, Retrieval,
    VisualCompactor, block_message_ids, extract_message_text,
};
