use crate::config::constants::{paths, visual_memory};
use crate::config::render::RenderConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Visual memory configuration, stored under the `visual_memory` key of
/// `~/.recall/config.json`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VisualMemoryConfig {
    /// Use the deterministic simulator instead of the remote OCR service
    #[serde(default = "default_use_mock")]
    pub use_mock: bool,

    /// Maximum number of cached visual memories
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    /// Maximum estimated cache size in megabytes
    #[serde(default = "default_cache_max_size_mb")]
    pub cache_max_size_mb: f64,

    /// Cache persistence file (supports `~` expansion)
    #[serde(default = "default_cache_path")]
    pub cache_path: String,

    /// Compression ratio reported by the simulator
    #[serde(default = "default_compression_target_ratio")]
    pub compression_target_ratio: f64,

    /// Artificial latency added to simulated compressions
    #[serde(default = "default_mock_latency_ms")]
    pub mock_latency_ms: u64,

    /// Name of the entry under `mcpServers` that hosts the OCR service
    #[serde(default = "default_remote_server_name", alias = "mcp_server_name")]
    pub remote_server_name: String,

    #[serde(default = "default_enable_auto_compression")]
    pub enable_auto_compression: bool,

    /// Messages older than this many positions become eligible for compression
    #[serde(default = "default_compression_age_threshold")]
    pub compression_age_threshold: usize,

    #[serde(
        default = "default_remote_timeout_seconds",
        alias = "mcp_timeout_seconds"
    )]
    pub remote_timeout_seconds: u64,

    #[serde(default = "default_remote_max_retries", alias = "mcp_max_retries")]
    pub remote_max_retries: u32,

    #[serde(default)]
    pub render: RenderConfig,
}

fn default_use_mock() -> bool {
    visual_memory::DEFAULT_USE_MOCK
}
fn default_cache_max_entries() -> usize {
    visual_memory::DEFAULT_CACHE_MAX_ENTRIES
}
fn default_cache_max_size_mb() -> f64 {
    visual_memory::DEFAULT_CACHE_MAX_SIZE_MB
}
fn default_cache_path() -> String {
    paths::DEFAULT_CACHE_PATH.to_string()
}
fn default_compression_target_ratio() -> f64 {
    visual_memory::DEFAULT_COMPRESSION_TARGET_RATIO
}
fn default_mock_latency_ms() -> u64 {
    visual_memory::DEFAULT_MOCK_LATENCY_MS
}
fn default_remote_server_name() -> String {
    visual_memory::DEFAULT_REMOTE_SERVER_NAME.to_string()
}
fn default_enable_auto_compression() -> bool {
    visual_memory::DEFAULT_ENABLE_AUTO_COMPRESSION
}
fn default_compression_age_threshold() -> usize {
    visual_memory::DEFAULT_COMPRESSION_AGE_THRESHOLD
}
fn default_remote_timeout_seconds() -> u64 {
    visual_memory::DEFAULT_REMOTE_TIMEOUT_SECONDS
}
fn default_remote_max_retries() -> u32 {
    visual_memory::DEFAULT_REMOTE_MAX_RETRIES
}

impl Default for VisualMemoryConfig {
    fn default() -> Self {
        Self {
            use_mock: default_use_mock(),
            cache_max_entries: default_cache_max_entries(),
            cache_max_size_mb: default_cache_max_size_mb(),
            cache_path: default_cache_path(),
            compression_target_ratio: default_compression_target_ratio(),
            mock_latency_ms: default_mock_latency_ms(),
            remote_server_name: default_remote_server_name(),
            enable_auto_compression: default_enable_auto_compression(),
            compression_age_threshold: default_compression_age_threshold(),
            remote_timeout_seconds: default_remote_timeout_seconds(),
            remote_max_retries: default_remote_max_retries(),
            render: RenderConfig::default(),
        }
    }
}

impl VisualMemoryConfig {
    /// Resolve the configured cache file to an absolute path
    ///
    /// - `~` is expanded to the user's home directory when available
    /// - Relative paths are resolved against `base` when supplied
    pub fn resolve_cache_path(&self, base: Option<&Path>) -> PathBuf {
        resolve_path(&self.cache_path, base)
    }

    /// Short label for the active compression backend
    pub fn mode_label(&self) -> &'static str {
        if self.use_mock { "MOCK" } else { "REAL" }
    }
}

pub(crate) fn resolve_path(input: &str, base: Option<&Path>) -> PathBuf {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return resolve_path(paths::DEFAULT_CACHE_PATH, base);
    }

    if let Some(stripped) = trimmed
        .strip_prefix("~/")
        .or_else(|| trimmed.strip_prefix("~\\"))
    {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
        return PathBuf::from(stripped);
    }

    let candidate = Path::new(trimmed);
    if candidate.is_absolute() {
        return candidate.to_path_buf();
    }

    if let Some(root) = base {
        return root.join(candidate);
    }

    candidate.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = VisualMemoryConfig::default();
        assert!(config.use_mock);
        assert_eq!(config.cache_max_entries, 50);
        assert_eq!(config.cache_max_size_mb, 100.0);
        assert_eq!(config.compression_target_ratio, 8.0);
        assert_eq!(config.mock_latency_ms, 100);
        assert_eq!(config.remote_server_name, "deepseek-ocr-runpod");
        assert!(config.enable_auto_compression);
        assert_eq!(config.compression_age_threshold, 10);
        assert_eq!(config.remote_timeout_seconds, 10);
        assert_eq!(config.remote_max_retries, 3);
        assert_eq!(config.mode_label(), "MOCK");
    }

    #[test]
    fn legacy_remote_field_names_are_accepted() {
        let config: VisualMemoryConfig = serde_json::from_str(
            r#"{"use_mock": false, "mcp_server_name": "ocr", "mcp_timeout_seconds": 3}"#,
        )
        .expect("config should parse");
        assert_eq!(config.remote_server_name, "ocr");
        assert_eq!(config.remote_timeout_seconds, 3);
        assert_eq!(config.remote_max_retries, 3);
        assert_eq!(config.mode_label(), "REAL");
    }

    #[test]
    fn resolves_home_and_relative_paths() {
        let config = VisualMemoryConfig {
            cache_path: "cache/visual.json".to_string(),
            ..VisualMemoryConfig::default()
        };
        let base = Path::new("/tmp/recall");
        assert_eq!(
            config.resolve_cache_path(Some(base)),
            PathBuf::from("/tmp/recall/cache/visual.json")
        );

        if let Some(home) = dirs::home_dir() {
            let config = VisualMemoryConfig::default();
            assert_eq!(
                config.resolve_cache_path(None),
                home.join(".recall/visual_cache.json")
            );
        }
    }
}
