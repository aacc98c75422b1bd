use crate::core::session::VisualMemorySession;
use crate::tools::traits::Tool;
use crate::tools::visual_memory::{
    CompressVisualMemoryTool, DecompressVisualMemoryTool, VisualMemoryStatsTool,
};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Schema advertised to the model for one tool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Name-indexed set of tools, in registration order
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: IndexMap<&'static str, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the three visual memory tools
    pub fn with_visual_memory_tools() -> Self {
        let mut registry = Self::new();
        registry.register_tool(Arc::new(CompressVisualMemoryTool));
        registry.register_tool(Arc::new(DecompressVisualMemoryTool));
        registry.register_tool(Arc::new(VisualMemoryStatsTool));
        registry
    }

    /// Register `tool`; a tool with the same name is replaced
    pub fn register_tool(&mut self, tool: Arc<dyn Tool>) {
        if self.tools.insert(tool.name(), tool.clone()).is_some() {
            warn!(tool = tool.name(), "replaced existing tool registration");
        }
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn available_tools(&self) -> Vec<&'static str> {
        self.tools.keys().copied().collect()
    }

    pub fn function_declarations(&self) -> Vec<FunctionDeclaration> {
        self.tools
            .values()
            .map(|tool| FunctionDeclaration {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect()
    }

    /// Run `name` with `args`; failures come back as `Error: ...` text
    pub async fn execute_tool(
        &self,
        session: &mut VisualMemorySession,
        name: &str,
        args: Value,
    ) -> String {
        let Some(tool) = self.tools.get(name) else {
            return format!("Error: Unknown tool '{name}'");
        };

        debug!(tool = name, "executing tool");
        let result = match tool.validate_args(&args) {
            Ok(()) => tool.execute(session, args).await,
            Err(err) => Err(err),
        };
        result.unwrap_or_else(|err| {
            warn!(tool = name, error = %err, "tool execution failed");
            format!("Error: {err}")
        })
    }
}
