use super::tool_result;
use anyhow::Result;
use console::style;
use recall_core::config::constants::tools;
use recall_core::core::VisualMemorySession;
use recall_core::tools::ToolRegistry;
use serde_json::json;

/// Handle the stats command
pub async fn handle_stats_command(session: &mut VisualMemorySession) -> Result<()> {
    let registry = ToolRegistry::with_visual_memory_tools();
    let output = registry
        .execute_tool(session, tools::VISUAL_MEMORY_STATS, json!({}))
        .await;
    println!("{}", tool_result(output)?);

    if let Some(path) = session.context.visual_cache.cache_path() {
        println!("{} {}", style("Cache file:").dim(), path.display());
    }
    Ok(())
}
