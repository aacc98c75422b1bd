//! Core trait for agent-callable tools

use crate::core::session::VisualMemorySession;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// A tool the agent can call against its visual memory session
#[async_trait]
pub trait Tool: Send + Sync {
    /// Execute the tool, returning text for the model
    async fn execute(&self, session: &mut VisualMemorySession, args: Value) -> Result<String>;

    /// Get the tool's name
    fn name(&self) -> &'static str;

    /// Get the tool's description
    fn description(&self) -> &'static str;

    /// JSON schema of the arguments
    fn parameters(&self) -> Value;

    /// Validate arguments before execution
    fn validate_args(&self, _args: &Value) -> Result<()> {
        Ok(())
    }
}
