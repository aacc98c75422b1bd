mod common;

use anyhow::Result;
use common::{test_config, test_renderer, test_session};
use recall_core::compression::{CompressionClient, RetryConfig, StdioInvoker};
use recall_core::config::RemoteServerConfig;
use recall_core::core::{Message, VisualMemorySession, load_transcript, save_transcript};
use recall_core::tools::ToolRegistry;
use recall_core::visual::{ConversationRenderer, PageRenderer, RenderedImage, VisualCache};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

/// user, 4 assistant turns, user, 3 assistant turns, user, 10 assistant turns
fn transcript() -> Vec<Message> {
    let mut messages = Vec::new();
    messages.push(Message::user("first question"));
    for i in 1..=4 {
        messages.push(Message::assistant(format!("step {i}: read src/lib.rs")));
    }
    messages.push(Message::user("second question"));
    for i in 6..=8 {
        messages.push(Message::assistant(format!("fn helper_{i}() -> usize {{ {i} }}")));
    }
    messages.push(Message::user("third question"));
    for i in 10..=19 {
        messages.push(Message::assistant(format!("recent answer {i}")));
    }
    messages
}

#[tokio::test]
async fn old_turns_become_placeholders_that_expand_again() -> Result<()> {
    let dir = tempdir()?;
    let cache_path = dir.path().join("visual_cache.json");
    let mut session = test_session(&cache_path);
    for message in transcript() {
        session.add_message(message);
    }

    let report = session.run_garbage_collection().await;
    assert_eq!(report.blocks_found, 2);
    assert_eq!(report.blocks_compressed, 2);
    assert_eq!(report.failures, 0);
    assert_eq!(report.messages_before, 20);
    assert_eq!(report.messages_after, 15);
    assert!(cache_path.exists());

    let messages = &session.context.messages;
    let marker = messages[1]
        .compressed_marker()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("expected a placeholder at index 1"))?;
    assert_eq!(marker.cache_key, "turn_1,turn_2,turn_3,turn_4");
    assert_eq!((marker.start_idx, marker.end_idx), (1, 4));
    assert_eq!(marker.token_count, 256);
    assert!(messages[3].is_compressed_placeholder());
    assert!(!messages[14].is_compressed_placeholder());
    assert_eq!(session.context.compressed_block_count(), 2);

    let placeholder = messages[1].content.as_text();
    assert!(
        placeholder.starts_with("[COMPRESSED: turns 1-4 → 256 visual tokens (8.0x compression)]")
    );

    let registry = ToolRegistry::with_visual_memory_tools();
    let output = registry
        .execute_tool(
            &mut session,
            "DecompressVisualMemory",
            json!({"message_ids": marker.message_ids}),
        )
        .await;
    assert!(
        output.starts_with("✓ Decompressed visual memory for: turn_1, turn_2, turn_3, turn_4"),
        "{output}"
    );

    let status = session.compression_status();
    assert!(status.starts_with("## Visual Memory: ENABLED (MOCK mode)"));
    assert!(status.contains("Compressed blocks: 2"));
    Ok(())
}

#[tokio::test]
async fn repeated_passes_leave_placeholders_alone() -> Result<()> {
    let dir = tempdir()?;
    let mut session = test_session(&dir.path().join("visual_cache.json"));
    for message in transcript() {
        session.add_message(message);
    }

    session.run_garbage_collection().await;
    let second = session.run_garbage_collection().await;
    assert_eq!(second.blocks_found, 0);
    assert_eq!(second.messages_before, second.messages_after);
    assert_eq!(session.context.visual_cache.len(), 2);
    Ok(())
}

#[tokio::test]
async fn cache_survives_into_a_new_session() -> Result<()> {
    let dir = tempdir()?;
    let cache_path = dir.path().join("visual_cache.json");
    {
        let mut session = test_session(&cache_path);
        for message in transcript() {
            session.add_message(message);
        }
        session.run_garbage_collection().await;
    }

    let mut restored = test_session(&cache_path);
    assert_eq!(restored.context.visual_cache.len(), 2);
    let registry = ToolRegistry::with_visual_memory_tools();
    let output = registry
        .execute_tool(
            &mut restored,
            "DecompressVisualMemory",
            json!({"message_ids": ["turn_6", "turn_7", "turn_8"]}),
        )
        .await;
    assert!(output.starts_with("✓ Decompressed visual memory"), "{output}");
    Ok(())
}

#[tokio::test]
async fn compacted_transcript_round_trips_through_disk() -> Result<()> {
    let dir = tempdir()?;
    let mut session = test_session(&dir.path().join("visual_cache.json"));
    for message in transcript() {
        session.add_message(message);
    }
    session.run_garbage_collection().await;

    let path = dir.path().join("transcript.json");
    save_transcript(&path, &session.context.messages)?;
    let reloaded = load_transcript(&path)?;
    assert_eq!(reloaded, session.context.messages);
    assert!(reloaded[1].is_compressed_placeholder());
    Ok(())
}

#[tokio::test]
async fn unreachable_remote_falls_back_to_simulator() -> Result<()> {
    let dir = tempdir()?;
    let mut config = test_config(&dir.path().join("visual_cache.json"));
    config.use_mock = false;

    let invoker = StdioInvoker::new(
        "ocr",
        RemoteServerConfig {
            command: "recall-test-missing-ocr-server".into(),
            args: Vec::new(),
            env: Default::default(),
        },
        Duration::from_secs(2),
    );
    let client = CompressionClient::with_invoker(&config, Arc::new(invoker))
        .with_retry(RetryConfig::immediate(2));
    let cache = VisualCache::from_config(&config);
    let mut session = VisualMemorySession::from_parts(config, cache, test_renderer(), client);
    for message in transcript() {
        session.add_message(message);
    }

    let report = session.run_garbage_collection().await;
    assert_eq!(report.blocks_compressed, 2);
    let memory = session
        .context
        .visual_cache
        .peek("turn_1,turn_2,turn_3,turn_4")
        .ok_or_else(|| anyhow::anyhow!("block was not cached"))?;
    assert_eq!(memory.visual_tokens.metadata["fallback"], json!(true));
    assert_eq!(memory.mode(), Some("MOCK"));
    assert_eq!(memory.token_count(), 256);
    Ok(())
}

/// Refuses to render any block whose text contains `trigger`
#[derive(Debug)]
struct RejectingRenderer {
    inner: ConversationRenderer,
    trigger: &'static str,
}

impl PageRenderer for RejectingRenderer {
    fn render_pages(&self, text: &str, message_ids: &[String]) -> Result<Vec<RenderedImage>> {
        if text.contains(self.trigger) {
            anyhow::bail!("page encoder rejected block");
        }
        self.inner.render_pages(text, message_ids)
    }
}

#[tokio::test]
async fn failing_block_is_skipped_while_others_compress() -> Result<()> {
    let dir = tempdir()?;
    let mut session = test_session(&dir.path().join("visual_cache.json"));
    session.compactor.set_page_renderer(Arc::new(RejectingRenderer {
        inner: test_renderer(),
        trigger: "helper_",
    }));
    for message in transcript() {
        session.add_message(message);
    }

    let report = session.run_garbage_collection().await;
    assert_eq!(report.blocks_found, 2);
    assert_eq!(report.blocks_compressed, 1);
    assert_eq!(report.failures, 1);
    assert_eq!(report.messages_after, 17);
    assert_eq!(session.context.compression_stats.errors, 1);

    let messages = &session.context.messages;
    assert!(messages[1].is_compressed_placeholder());
    assert_eq!(messages[2].content.as_text(), "second question");
    for (offset, i) in (6..=8).enumerate() {
        let message = &messages[3 + offset];
        assert!(!message.is_compressed_placeholder());
        assert_eq!(message.content.as_text(), format!("fn helper_{i}() -> usize {{ {i} }}"));
    }
    assert!(session.context.visual_cache.contains("turn_1,turn_2,turn_3,turn_4"));
    assert!(!session.context.visual_cache.contains("turn_6,turn_7,turn_8"));
    Ok(())
}
