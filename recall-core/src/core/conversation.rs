//! Conversation messages and the per-session context that owns them

use crate::visual::cache::VisualCache;
use crate::visual::models::CompressionStats;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// Metadata attached to the text block of a compression placeholder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressedMarker {
    pub compressed: bool,
    pub cache_key: String,
    pub start_idx: usize,
    pub end_idx: usize,
    pub token_count: usize,
    pub compression_ratio: f64,
    #[serde(default)]
    pub message_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<CompressedMarker>,
    },
    ToolUse {
        #[serde(default)]
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        #[serde(default)]
        tool_use_id: String,
        #[serde(default)]
        content: Value,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text {
            text: text.into(),
            metadata: None,
        }
    }
}

/// Message body: either plain text or a list of typed blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl MessageContent {
    /// Plain text view: text blocks verbatim, tool blocks as one-line tags
    pub fn as_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .map(|block| match block {
                    ContentBlock::Text { text, .. } => text.clone(),
                    ContentBlock::ToolUse { name, .. } => format!("[Tool: {name}]"),
                    ContentBlock::ToolResult { .. } => "[Tool Result]".to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: MessageContent,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn assistant_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: MessageContent::Blocks(blocks),
        }
    }

    /// Placeholder metadata, when this message stands in for compressed turns
    pub fn compressed_marker(&self) -> Option<&CompressedMarker> {
        let MessageContent::Blocks(blocks) = &self.content else {
            return None;
        };
        blocks.iter().find_map(|block| match block {
            ContentBlock::Text {
                metadata: Some(marker),
                ..
            } if marker.compressed => Some(marker),
            _ => None,
        })
    }

    pub fn is_compressed_placeholder(&self) -> bool {
        self.compressed_marker().is_some()
    }
}

/// Messages of one session together with its visual memory state
#[derive(Debug)]
pub struct ConversationContext {
    pub messages: Vec<Message>,
    pub visual_cache: VisualCache,
    pub compression_stats: CompressionStats,
}

impl ConversationContext {
    pub fn new(visual_cache: VisualCache) -> Self {
        Self {
            messages: Vec::new(),
            visual_cache,
            compression_stats: CompressionStats::default(),
        }
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Rough token count: serialized characters / 4
    pub fn token_count_estimate(&self) -> usize {
        self.messages
            .iter()
            .map(|message| match &message.content {
                MessageContent::Text(text) => text.chars().count(),
                MessageContent::Blocks(blocks) => serde_json::to_string(blocks)
                    .map(|s| s.chars().count())
                    .unwrap_or(0),
            })
            .sum::<usize>()
            / crate::config::constants::visual_memory::CHARS_PER_TEXT_TOKEN
    }

    /// Number of placeholders currently standing in for compressed turns
    pub fn compressed_block_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|message| message.is_compressed_placeholder())
            .count()
    }

    /// Messages as plain API payloads, without placeholder metadata
    pub fn messages_for_api(&self) -> Vec<Value> {
        self.messages
            .iter()
            .filter_map(|message| {
                let mut value = serde_json::to_value(message).ok()?;
                if let Some(blocks) = value.get_mut("content").and_then(Value::as_array_mut) {
                    for block in blocks {
                        if let Some(fields) = block.as_object_mut() {
                            fields.remove("metadata");
                        }
                    }
                }
                Some(value)
            })
            .collect()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TranscriptFile {
    Messages(Vec<Message>),
    Wrapped { messages: Vec<Message> },
}

/// Read a transcript: a JSON array of messages or `{"messages": [...]}`
pub fn load_transcript(path: &Path) -> Result<Vec<Message>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read transcript: {}", path.display()))?;
    let parsed: TranscriptFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse transcript: {}", path.display()))?;
    Ok(match parsed {
        TranscriptFile::Messages(messages) | TranscriptFile::Wrapped { messages } => messages,
    })
}

/// Write messages as a pretty-printed JSON array
pub fn save_transcript(path: &Path, messages: &[Message]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let content =
        serde_json::to_string_pretty(messages).context("Failed to serialize transcript")?;
    fs::write(path, content)
        .with_context(|| format!("Failed to write transcript: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn parses_anthropic_style_blocks() {
        let message: Message = serde_json::from_value(json!({
            "role": "assistant",
            "content": [
                {"type": "text", "text": "Reading the file"},
                {"type": "tool_use", "id": "t1", "name": "Read", "input": {"path": "a.rs"}},
                {"type": "tool_result", "tool_use_id": "t1", "content": "fn main() {}"}
            ]
        }))
        .expect("message should parse");

        assert_eq!(message.role, MessageRole::Assistant);
        assert_eq!(
            message.content.as_text(),
            "Reading the file\n[Tool: Read]\n[Tool Result]"
        );
        assert!(!message.is_compressed_placeholder());
    }

    #[test]
    fn api_view_strips_placeholder_metadata() {
        let marker = CompressedMarker {
            compressed: true,
            cache_key: "turn_0".into(),
            start_idx: 0,
            end_idx: 0,
            token_count: 256,
            compression_ratio: 8.0,
            message_ids: vec!["turn_0".into()],
        };
        let placeholder = Message::assistant_blocks(vec![ContentBlock::Text {
            text: "[COMPRESSED]".into(),
            metadata: Some(marker),
        }]);
        let context = ConversationContext::new(VisualCache::new(5, 1.0))
            .with_messages(vec![Message::user("hi"), placeholder]);

        assert_eq!(context.compressed_block_count(), 1);
        let api = context.messages_for_api();
        assert_eq!(api[0], json!({"role": "user", "content": "hi"}));
        assert!(api[1]["content"][0].get("metadata").is_none());
        assert_eq!(api[1]["content"][0]["text"], "[COMPRESSED]");
    }

    #[test]
    fn transcript_accepts_both_shapes() -> Result<()> {
        let dir = tempdir()?;
        let bare = dir.path().join("bare.json");
        let wrapped = dir.path().join("wrapped.json");
        fs::write(&bare, r#"[{"role": "user", "content": "hello"}]"#)?;
        fs::write(
            &wrapped,
            r#"{"messages": [{"role": "assistant", "content": "hey"}]}"#,
        )?;

        assert_eq!(load_transcript(&bare)?, vec![Message::user("hello")]);
        assert_eq!(load_transcript(&wrapped)?, vec![Message::assistant("hey")]);

        let out = dir.path().join("out").join("t.json");
        save_transcript(&out, &[Message::user("x")])?;
        assert_eq!(load_transcript(&out)?, vec![Message::user("x")]);
        Ok(())
    }

    #[test]
    fn token_estimate_is_quarter_of_characters() {
        let context = ConversationContext::new(VisualCache::new(5, 1.0))
            .with_messages(vec![Message::user("a".repeat(40))]);
        assert_eq!(context.token_count_estimate(), 10);
    }
}
