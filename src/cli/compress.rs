use super::{persist, read_text, tool_result};
use anyhow::Result;
use recall_core::config::constants::tools;
use recall_core::core::VisualMemorySession;
use recall_core::tools::ToolRegistry;
use serde_json::json;
use std::path::PathBuf;

/// Handle the compress command
pub async fn handle_compress_command(
    session: &mut VisualMemorySession,
    text: Option<String>,
    file: Option<PathBuf>,
    ids: Vec<String>,
) -> Result<()> {
    let text = read_text(text, file.as_deref()).await?;
    let registry = ToolRegistry::with_visual_memory_tools();
    let output = registry
        .execute_tool(
            session,
            tools::COMPRESS_VISUAL_MEMORY,
            json!({ "text": text, "message_ids": ids }),
        )
        .await;

    let output = tool_result(output)?;
    println!("{output}");
    persist(session);
    Ok(())
}
