//! Command-line interface module
//!
//! Argument parsing lives in [`args`]; each subcommand has its own handler
//! module. Every handler works on a [`VisualMemorySession`] opened from the
//! loaded configuration and saves the cache after it changes.

pub mod args;
mod compress;
mod config;
mod decompress;
mod gc;
mod health;
mod render;
mod stats;

pub use args::{Cli, Commands, ConfigAction};
pub use compress::handle_compress_command;
pub use config::handle_config_command;
pub use decompress::handle_decompress_command;
pub use gc::handle_gc_command;
pub use health::handle_health_command;
pub use render::{RenderSource, handle_render_command};
pub use stats::handle_stats_command;

use anyhow::{Context, Result, bail};
use console::style;
use recall_core::config::ConfigManager;
use recall_core::core::VisualMemorySession;
use std::path::Path;
use tracing::debug;

pub fn load_manager(path: Option<&Path>) -> Result<ConfigManager> {
    match path {
        Some(path) => ConfigManager::load_from_file(path),
        None => ConfigManager::load(),
    }
}

/// Session for one command, with `--mock`/`--remote` applied
pub fn open_session(manager: &ConfigManager, mock: bool, remote: bool) -> VisualMemorySession {
    debug!(config = %manager.config_path().display(), mock, remote, "opening session");
    let mut session = VisualMemorySession::open(manager);
    if mock {
        session.switch_mode(true);
    } else if remote {
        session.switch_mode(false);
    }
    session
}

/// Text from `--text`, else the contents of `--file`
pub(crate) async fn read_text(text: Option<String>, file: Option<&Path>) -> Result<String> {
    match (text, file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display())),
        (None, None) => bail!("Provide the text with --text or --file"),
    }
}

/// Tool output as a result; tools report failures as `Error: ...` strings
pub(crate) fn tool_result(output: String) -> Result<String> {
    match output.strip_prefix("Error: ") {
        Some(message) => bail!("{message}"),
        None => Ok(output),
    }
}

pub(crate) fn persist(session: &VisualMemorySession) {
    if !session.persist() {
        eprintln!(
            "{} visual cache could not be saved",
            style("warning:").yellow().bold()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn tool_errors_become_failures() {
        assert!(tool_result("✓ Compressed".to_string()).is_ok());
        let err = tool_result("Error: Must provide at least one message ID".to_string());
        assert_eq!(
            err.map_err(|e| e.to_string()).err().as_deref(),
            Some("Must provide at least one message ID")
        );
    }

    #[tokio::test]
    async fn text_wins_over_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("input.txt");
        tokio::fs::write(&path, "from file").await?;

        assert_eq!(read_text(Some("inline".into()), Some(&path)).await?, "inline");
        assert_eq!(read_text(None, Some(&path)).await?, "from file");
        assert!(read_text(None, None).await.is_err());
        Ok(())
    }
}
