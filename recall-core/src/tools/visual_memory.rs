//! Tools exposing visual memory to the agent

use crate::config::constants::{cache, tools};
use crate::core::session::VisualMemorySession;
use crate::core::visual_compaction::Retrieval;
use crate::tools::traits::Tool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::fmt::Write as _;

#[derive(Debug, Deserialize)]
struct CompressArgs {
    text: String,
    #[serde(default)]
    message_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DecompressArgs {
    #[serde(default)]
    message_ids: Vec<String>,
}

fn parse_args<T: for<'de> Deserialize<'de>>(tool: &str, args: Value) -> Result<T> {
    serde_json::from_value(args).with_context(|| format!("Invalid arguments for {tool}"))
}

/// Render text and store it as visual tokens
pub struct CompressVisualMemoryTool;

#[async_trait]
impl Tool for CompressVisualMemoryTool {
    async fn execute(&self, session: &mut VisualMemorySession, args: Value) -> Result<String> {
        let args: CompressArgs = parse_args(self.name(), args)?;
        let outcome = session
            .compactor
            .compress_text(&mut session.context, &args.text, args.message_ids)
            .await?;
        let memory = &outcome.memory;

        let mut output = format!(
            "✓ Compressed {} chars → {} visual tokens\n\
             Compression: {:.1}x\n\
             Savings: ~{} tokens\n\
             Cache: Stored under key '{}'\n\
             Mode: {}\n\
             Latency: {:.0}ms",
            memory.original_text_length,
            memory.token_count(),
            memory.compression_ratio,
            memory.savings_estimate(),
            outcome.cache_key,
            session.compactor.client().mode_label(),
            outcome.latency_ms,
        );
        if outcome.pages_rendered > 1 {
            let _ = write!(
                output,
                "\nNote: text spans {} pages; only the first page was compressed.",
                outcome.pages_rendered
            );
        }
        Ok(output)
    }

    fn name(&self) -> &'static str {
        tools::COMPRESS_VISUAL_MEMORY
    }

    fn description(&self) -> &'static str {
        "Compresses text into visual memory: the text is rendered to an image and encoded as visual tokens, then cached under the given message IDs. Use it to archive long tool output or old discussion that may be needed later. Retrieve it with DecompressVisualMemory using the same message IDs."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {"type": "string", "description": "Text to compress"},
                "message_ids": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Identifiers the memory is stored under. Example: ['turn_3', 'turn_4']"
                }
            },
            "required": ["text", "message_ids"]
        })
    }
}

/// Retrieve a stored visual memory
pub struct DecompressVisualMemoryTool;

#[async_trait]
impl Tool for DecompressVisualMemoryTool {
    async fn execute(&self, session: &mut VisualMemorySession, args: Value) -> Result<String> {
        let args: DecompressArgs = parse_args(self.name(), args)?;
        if args.message_ids.is_empty() {
            anyhow::bail!("Must provide at least one message ID");
        }

        let retrieval = session
            .compactor
            .retrieve(&mut session.context, &args.message_ids)
            .await;

        match retrieval {
            Retrieval::Found { memory, text, .. } => {
                let mode = memory
                    .mode()
                    .unwrap_or(session.compactor.client().mode_label())
                    .to_string();
                Ok(format!(
                    "✓ Decompressed visual memory for: {}\n\
                     Token count: {}\n\
                     Original length: {} chars\n\
                     Compression ratio: {:.1}x\n\
                     Mode: {mode}\n\n\
                     Decompressed content:\n{text}",
                    memory.message_ids.join(", "),
                    memory.token_count(),
                    memory.original_text_length,
                    memory.compression_ratio,
                ))
            }
            Retrieval::Missing { available_keys, .. } => {
                let mut output = format!(
                    "Error: No visual memory found for message IDs: {}\n",
                    args.message_ids.join(", ")
                );
                if available_keys.is_empty() {
                    output.push_str("(Cache is empty)");
                } else {
                    output.push_str("Available keys:");
                    for key in available_keys.iter().take(cache::MISS_KEY_PREVIEW) {
                        let _ = write!(output, "\n  - {key}");
                    }
                    if available_keys.len() > cache::MISS_KEY_PREVIEW {
                        let _ = write!(
                            output,
                            "\n  ... and {} more",
                            available_keys.len() - cache::MISS_KEY_PREVIEW
                        );
                    }
                }
                Ok(output)
            }
        }
    }

    fn name(&self) -> &'static str {
        tools::DECOMPRESS_VISUAL_MEMORY
    }

    fn description(&self) -> &'static str {
        "Retrieves visual memory previously stored with CompressVisualMemory or by automatic compression of old turns. Pass the exact message IDs the memory was stored under, as listed in the compressed placeholder."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "message_ids": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Message IDs of the compressed block, in order"
                }
            },
            "required": ["message_ids"]
        })
    }
}

/// Report cache and compression statistics
pub struct VisualMemoryStatsTool;

#[async_trait]
impl Tool for VisualMemoryStatsTool {
    async fn execute(&self, session: &mut VisualMemorySession, _args: Value) -> Result<String> {
        let stats = session.context.visual_cache.stats();
        let compression = &session.context.compression_stats;
        let keys = session.context.visual_cache.keys();

        let mut output = String::from("Visual Memory Cache Statistics\n");
        output.push_str("==============================\n");
        let _ = writeln!(output, "Entries: {}/{}", stats.entries, stats.max_entries);
        let _ = writeln!(
            output,
            "Size: {:.2} MB / {:.0} MB",
            stats.size_mb, stats.max_size_mb
        );
        let _ = writeln!(
            output,
            "Hit rate: {:.1}% ({} hits, {} misses)",
            stats.hit_rate, stats.hits, stats.misses
        );
        let _ = writeln!(output, "Evictions: {}", stats.evictions);
        let _ = writeln!(
            output,
            "Compressions: {} (errors: {}), decompressions: {}",
            compression.total_compressions, compression.errors, compression.total_decompressions
        );
        let _ = write!(output, "Mode: {}", session.compactor.client().mode_label());

        if !keys.is_empty() {
            output.push_str("\n\nCached keys:");
            for key in keys.iter().take(cache::STATS_KEY_PREVIEW) {
                let _ = write!(output, "\n  - {key}");
            }
            if keys.len() > cache::STATS_KEY_PREVIEW {
                let _ = write!(
                    output,
                    "\n  ... and {} more",
                    keys.len() - cache::STATS_KEY_PREVIEW
                );
            }
        }
        Ok(output)
    }

    fn name(&self) -> &'static str {
        tools::VISUAL_MEMORY_STATS
    }

    fn description(&self) -> &'static str {
        "Shows visual memory cache statistics: entry count, estimated size, hit rate, evictions, the active compression mode and the most recently stored keys."
    }

    fn parameters(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }
}
