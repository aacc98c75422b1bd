//! Replacing old conversation turns with visual memory placeholders
//!
//! Old, non-user turns are grouped into contiguous blocks, flattened to
//! text, rendered, compressed and cached. Each block is then spliced out of
//! the transcript and replaced by a single assistant message that records
//! where the tokens live.

use crate::compression::{CompressionClient, CompressionMode};
use crate::config::VisualMemoryConfig;
use crate::config::constants::visual_memory;
use crate::core::conversation::{
    CompressedMarker, ContentBlock, ConversationContext, Message, MessageContent, MessageRole,
};
use crate::visual::cache::cache_key;
use crate::visual::models::VisualMemory;
use crate::visual::renderer::{ConversationRenderer, PageRenderer};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("Cannot compress empty text")]
    EmptyText,
    #[error("Must provide at least one message ID")]
    NoMessageIds,
    #[error("failed to render text: {0}")]
    RenderFailed(String),
    #[error("renderer produced no pages")]
    NoPages,
}

/// Which messages may be compressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactionPolicy {
    /// Messages must be more than this many positions from the end
    pub age_threshold: usize,
    /// The last `safety_buffer` messages are never touched
    pub safety_buffer: usize,
}

impl Default for CompactionPolicy {
    fn default() -> Self {
        Self {
            age_threshold: visual_memory::DEFAULT_COMPRESSION_AGE_THRESHOLD,
            safety_buffer: visual_memory::SAFETY_BUFFER,
        }
    }
}

impl CompactionPolicy {
    pub fn from_config(config: &VisualMemoryConfig) -> Self {
        Self {
            age_threshold: config.compression_age_threshold,
            ..Self::default()
        }
    }

    fn is_eligible(&self, message: &Message, index: usize, total: usize) -> bool {
        total - index > self.age_threshold
            && message.role != MessageRole::User
            && !message.is_compressed_placeholder()
    }

    /// Inclusive `(start, end)` ranges of contiguous eligible messages
    pub fn identify_compressible_blocks(&self, messages: &[Message]) -> Vec<(usize, usize)> {
        let total = messages.len();
        let limit = total.saturating_sub(self.safety_buffer);

        let mut blocks = Vec::new();
        let mut start = None;
        for (index, message) in messages.iter().enumerate().take(limit) {
            if self.is_eligible(message, index, total) {
                start.get_or_insert(index);
            } else if let Some(block_start) = start.take() {
                blocks.push((block_start, index - 1));
            }
        }
        if let Some(block_start) = start {
            blocks.push((block_start, limit - 1));
        }
        blocks
    }
}

/// Synthetic identifiers for messages `start..=end`
pub fn block_message_ids(start: usize, end: usize) -> Vec<String> {
    (start..=end)
        .map(|index| format!("{}{index}", visual_memory::MESSAGE_ID_PREFIX))
        .collect()
}

fn preview(text: &str) -> String {
    let limit = visual_memory::TOOL_PREVIEW_CHARS;
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let cut: String = text.chars().take(limit).collect();
    format!("{cut}...")
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item.get("text").and_then(Value::as_str) {
                Some(text) => text.to_string(),
                None => value_text(item),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Flatten messages into the text that gets rendered
pub fn extract_message_text(messages: &[Message]) -> String {
    let mut sections = Vec::with_capacity(messages.len());
    for message in messages {
        let mut section = format!("[{}]", message.role.as_str().to_uppercase());
        match &message.content {
            MessageContent::Text(text) => {
                section.push('\n');
                section.push_str(text);
            }
            MessageContent::Blocks(blocks) => {
                for block in blocks {
                    section.push('\n');
                    match block {
                        ContentBlock::Text { text, .. } => section.push_str(text),
                        ContentBlock::ToolUse { name, input, .. } => {
                            section.push_str(&format!(
                                "[Tool: {name}] Input: {}",
                                preview(&input.to_string())
                            ));
                        }
                        ContentBlock::ToolResult { content, .. } => {
                            section.push_str(&format!(
                                "[Tool Result] {}",
                                preview(&value_text(content))
                            ));
                        }
                    }
                }
            }
        }
        sections.push(section);
    }
    sections.join("\n\n")
}

/// Result of compressing one piece of text
#[derive(Debug, Clone)]
pub struct CompressionOutcome {
    pub cache_key: String,
    pub memory: VisualMemory,
    pub pages_rendered: usize,
    pub latency_ms: f64,
}

/// Result of looking up a visual memory
#[derive(Debug, Clone)]
pub enum Retrieval {
    Found {
        cache_key: String,
        memory: VisualMemory,
        text: String,
        latency_ms: f64,
    },
    Missing {
        cache_key: String,
        available_keys: Vec<String>,
    },
}

/// Summary of one compaction pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompactionReport {
    pub blocks_found: usize,
    pub blocks_compressed: usize,
    pub failures: usize,
    pub tokens_saved: i64,
    pub messages_before: usize,
    pub messages_after: usize,
}

/// Drives rendering, compression and caching for a conversation
#[derive(Debug)]
pub struct VisualCompactor {
    policy: CompactionPolicy,
    renderer: ConversationRenderer,
    pages: Arc<dyn PageRenderer>,
    client: CompressionClient,
    target_ratio: f64,
    enabled: bool,
}

impl VisualCompactor {
    pub fn new(
        config: &VisualMemoryConfig,
        renderer: ConversationRenderer,
        client: CompressionClient,
    ) -> Self {
        Self {
            policy: CompactionPolicy::from_config(config),
            pages: Arc::new(renderer.clone()),
            renderer,
            client,
            target_ratio: config.compression_target_ratio,
            enabled: config.enable_auto_compression,
        }
    }

    pub fn policy(&self) -> &CompactionPolicy {
        &self.policy
    }

    pub fn renderer(&self) -> &ConversationRenderer {
        &self.renderer
    }

    /// Route block rendering through `pages` instead of the configured renderer
    pub fn set_page_renderer(&mut self, pages: Arc<dyn PageRenderer>) {
        self.pages = pages;
    }

    pub fn client(&self) -> &CompressionClient {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut CompressionClient {
        &mut self.client
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        info!(enabled, "visual compression toggled");
    }

    pub fn identify_compressible_blocks(&self, messages: &[Message]) -> Vec<(usize, usize)> {
        self.policy.identify_compressible_blocks(messages)
    }

    /// Render `text`, compress its first page and cache the result
    pub async fn compress_text(
        &self,
        context: &mut ConversationContext,
        text: &str,
        message_ids: Vec<String>,
    ) -> Result<CompressionOutcome, CompressionError> {
        if text.trim().is_empty() {
            return Err(CompressionError::EmptyText);
        }
        if message_ids.is_empty() {
            return Err(CompressionError::NoMessageIds);
        }

        let images = self
            .pages
            .render_pages(text, &message_ids)
            .map_err(|err| CompressionError::RenderFailed(format!("{err:#}")))?;
        let first = images.first().ok_or(CompressionError::NoPages)?;

        let started = Instant::now();
        let tokens = self.client.compress(&first.image_bytes).await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        let ratio = tokens.compression_ratio().unwrap_or(self.target_ratio);
        let fell_back = tokens.metadata.get("fallback") == Some(&Value::Bool(true));
        let mode = if fell_back {
            CompressionMode::Simulated.label()
        } else {
            self.client.mode_label()
        };
        let memory = VisualMemory::new(message_ids, tokens, text.chars().count(), ratio)
            .with_metadata("mode", mode)
            .with_metadata("pages_rendered", images.len())
            .with_metadata("latency_ms", latency_ms);

        let key = cache_key(&memory.message_ids);
        context.visual_cache.put(key.clone(), memory.clone());
        context
            .compression_stats
            .record_compression(memory.savings_estimate(), ratio, latency_ms);

        info!(
            key = %key,
            chars = memory.original_text_length,
            tokens = memory.token_count(),
            pages = images.len(),
            latency_ms,
            "compressed text into visual memory"
        );

        Ok(CompressionOutcome {
            cache_key: key,
            memory,
            pages_rendered: images.len(),
            latency_ms,
        })
    }

    /// Compress messages `start..=end`; `None` when they hold no text
    pub async fn compress_block(
        &self,
        context: &mut ConversationContext,
        start: usize,
        end: usize,
    ) -> Result<Option<CompressionOutcome>, CompressionError> {
        let text = extract_message_text(&context.messages[start..=end]);
        if text.trim().is_empty() {
            return Ok(None);
        }
        self.compress_text(context, &text, block_message_ids(start, end))
            .await
            .map(Some)
    }

    /// Replace messages `start..=end` with one placeholder message
    pub fn replace_with_placeholder(
        &self,
        messages: &mut Vec<Message>,
        start: usize,
        end: usize,
        outcome: &CompressionOutcome,
    ) {
        let memory = &outcome.memory;
        let text = format!(
            "[COMPRESSED: turns {start}-{end} → {} visual tokens ({:.1}x compression)]\n\
             Cache key: {}. Use DecompressVisualMemory with these message IDs to retrieve.",
            memory.token_count(),
            memory.compression_ratio,
            outcome.cache_key,
        );
        let marker = CompressedMarker {
            compressed: true,
            cache_key: outcome.cache_key.clone(),
            start_idx: start,
            end_idx: end,
            token_count: memory.token_count(),
            compression_ratio: memory.compression_ratio,
            message_ids: memory.message_ids.clone(),
        };
        let placeholder = Message::assistant_blocks(vec![ContentBlock::Text {
            text,
            metadata: Some(marker),
        }]);
        let _replaced: Vec<Message> = messages
            .splice(start..=end, std::iter::once(placeholder))
            .collect();
    }

    /// Compress every eligible block, latest first so indices stay valid
    ///
    /// A failing block is logged and skipped. The cache is persisted after
    /// any successful compression.
    pub async fn compress_old_messages(
        &self,
        context: &mut ConversationContext,
    ) -> CompactionReport {
        let mut report = CompactionReport {
            messages_before: context.messages.len(),
            messages_after: context.messages.len(),
            ..CompactionReport::default()
        };
        if !self.enabled {
            debug!("visual compression disabled, skipping");
            return report;
        }

        let blocks = self.identify_compressible_blocks(&context.messages);
        report.blocks_found = blocks.len();

        for (start, end) in blocks.into_iter().rev() {
            match self.compress_block(context, start, end).await {
                Ok(Some(outcome)) => {
                    self.replace_with_placeholder(&mut context.messages, start, end, &outcome);
                    report.blocks_compressed += 1;
                    report.tokens_saved += outcome.memory.savings_estimate();
                }
                Ok(None) => debug!(start, end, "block has no text, skipping"),
                Err(err) => {
                    error!(start, end, error = %err, "failed to compress block");
                    context.compression_stats.record_error();
                    report.failures += 1;
                }
            }
        }

        report.messages_after = context.messages.len();
        if report.blocks_compressed > 0 && context.visual_cache.cache_path().is_some() {
            context.visual_cache.save(None);
        }
        info!(
            found = report.blocks_found,
            compressed = report.blocks_compressed,
            before = report.messages_before,
            after = report.messages_after,
            "visual compaction pass finished"
        );
        report
    }

    /// Look up and decompress the memory stored for `message_ids`
    pub async fn retrieve(
        &self,
        context: &mut ConversationContext,
        message_ids: &[String],
    ) -> Retrieval {
        let key = cache_key(message_ids);
        let started = Instant::now();
        let Some(memory) = context.visual_cache.get(&key).cloned() else {
            context.compression_stats.record_cache_miss();
            debug!(key = %key, "visual memory not found");
            return Retrieval::Missing {
                available_keys: context.visual_cache.keys(),
                cache_key: key,
            };
        };

        let text = self.client.decompress(&memory.visual_tokens).await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        context
            .compression_stats
            .record_decompression(latency_ms, true);

        Retrieval::Found {
            cache_key: key,
            memory,
            text,
            latency_ms,
        }
    }

    /// Status block for the system prompt
    pub fn build_compression_status(&self, context: &ConversationContext) -> String {
        let state = if self.enabled { "ENABLED" } else { "DISABLED" };
        let cache = context.visual_cache.stats();
        let stats = &context.compression_stats;
        format!(
            "## Visual Memory: {state} ({} mode)\n\
             Compressed blocks: {}\n\
             Cache: {}/{} entries, {:.2} MB\n\
             Estimated tokens saved: {}\n\
             Average compression ratio: {:.1}x",
            self.client.mode_label(),
            context.compressed_block_count(),
            cache.entries,
            cache.max_entries,
            cache.size_mb,
            stats.total_tokens_saved,
            stats.average_compression_ratio,
        )
    }
}
