use super::{persist, tool_result};
use anyhow::Result;
use recall_core::config::constants::tools;
use recall_core::core::VisualMemorySession;
use recall_core::tools::ToolRegistry;
use serde_json::json;

/// Handle the decompress command
///
/// Lookups move the entry to the front of the LRU order, so the cache is
/// saved even on a miss to keep the counters.
pub async fn handle_decompress_command(
    session: &mut VisualMemorySession,
    ids: Vec<String>,
) -> Result<()> {
    let registry = ToolRegistry::with_visual_memory_tools();
    let output = registry
        .execute_tool(
            session,
            tools::DECOMPRESS_VISUAL_MEMORY,
            json!({ "message_ids": ids }),
        )
        .await;
    persist(session);

    let output = tool_result(output)?;
    println!("{output}");
    Ok(())
}
