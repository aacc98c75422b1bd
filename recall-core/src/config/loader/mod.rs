use crate::config::constants::{paths, remote};
use crate::config::visual_memory::VisualMemoryConfig;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const VISUAL_MEMORY_KEY: &str = "visual_memory";

/// Launch description for a remote service registered under `mcpServers`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RemoteServerConfig {
    pub command: String,
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// Directory holding recall's config and cache files
///
/// `RECALL_HOME` wins when set; otherwise `~/.recall`.
pub fn recall_home() -> PathBuf {
    if let Ok(custom) = std::env::var(paths::HOME_ENV_VAR) {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }

    match dirs::home_dir() {
        Some(home) => home.join(paths::HOME_DIR_NAME),
        None => PathBuf::from(paths::HOME_DIR_NAME),
    }
}

pub fn default_config_path() -> PathBuf {
    recall_home().join(paths::CONFIG_FILE_NAME)
}

/// Loads, edits and persists the visual memory section of the config file
///
/// Other top-level keys (including `mcpServers`) are kept untouched on save.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: VisualMemoryConfig,
    document: Map<String, Value>,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from_file(default_config_path())
    }

    /// Load configuration from a specific file; a missing file yields defaults
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self {
                config: VisualMemoryConfig::default(),
                document: Map::new(),
                config_path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let document: Map<String, Value> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        let config = match document.get(VISUAL_MEMORY_KEY) {
            Some(section) => serde_json::from_value(section.clone()).with_context(|| {
                format!(
                    "Invalid '{VISUAL_MEMORY_KEY}' section in config file: {}",
                    path.display()
                )
            })?,
            None => VisualMemoryConfig::default(),
        };

        Ok(Self {
            config,
            document,
            config_path: path.to_path_buf(),
        })
    }

    pub fn config(&self) -> &VisualMemoryConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Apply an in-memory edit; call [`ConfigManager::save`] to persist it
    pub fn update<F>(&mut self, edit: F)
    where
        F: FnOnce(&mut VisualMemoryConfig),
    {
        edit(&mut self.config);
    }

    /// Set a single field from its textual form, e.g. `cache_max_entries=20`
    ///
    /// The value is parsed as JSON first and falls back to a plain string.
    pub fn set_value(&mut self, key: &str, raw: &str) -> Result<()> {
        let mut current =
            serde_json::to_value(&self.config).context("Failed to serialize configuration")?;
        let Some(fields) = current.as_object_mut() else {
            bail!("configuration did not serialize to an object");
        };
        if !fields.contains_key(key) {
            bail!("Unknown configuration key '{key}'");
        }

        let value =
            serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.into()));
        fields.insert(key.to_string(), value);

        self.config = serde_json::from_value(current)
            .with_context(|| format!("Invalid value '{raw}' for '{key}'"))?;
        Ok(())
    }

    /// Restore every field to its default value
    pub fn reset(&mut self) {
        self.config = VisualMemoryConfig::default();
    }

    /// Write the config back, creating the parent directory if needed
    pub fn save(&mut self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let section =
            serde_json::to_value(&self.config).context("Failed to serialize configuration")?;
        self.document.insert(VISUAL_MEMORY_KEY.to_string(), section);

        let content = serde_json::to_string_pretty(&self.document)
            .context("Failed to serialize config document")?;
        fs::write(&self.config_path, content).with_context(|| {
            format!("Failed to write config file: {}", self.config_path.display())
        })?;

        debug!(path = %self.config_path.display(), "saved visual memory config");
        Ok(())
    }

    /// Look up a remote service definition by name
    ///
    /// Returns `None` when the entry is absent or lacks `command`/`args`.
    pub fn remote_server(&self, name: &str) -> Option<RemoteServerConfig> {
        let entry = self
            .document
            .get(remote::SERVERS_KEY)
            .and_then(|servers| servers.get(name))?;

        match serde_json::from_value::<RemoteServerConfig>(entry.clone()) {
            Ok(server) => Some(server),
            Err(err) => {
                warn!(server = name, error = %err, "remote server entry is incomplete");
                None
            }
        }
    }
}

/// Load the visual memory config from the default location
///
/// Missing or malformed files fall back to defaults.
pub fn load_config() -> VisualMemoryConfig {
    match ConfigManager::load() {
        Ok(manager) => manager.config,
        Err(err) => {
            warn!(error = %err, "failed to load config, using defaults");
            VisualMemoryConfig::default()
        }
    }
}

/// Persist `config` to the default location, keeping unrelated keys
pub fn save_config(config: &VisualMemoryConfig) -> bool {
    update_config(|current| *current = config.clone())
}

/// Edit the stored config in place and save it
pub fn update_config<F>(edit: F) -> bool
where
    F: FnOnce(&mut VisualMemoryConfig),
{
    let result = ConfigManager::load().and_then(|mut manager| {
        manager.update(edit);
        manager.save()
    });

    match result {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, "failed to save config");
            false
        }
    }
}

/// Write the default visual memory section back to disk
pub fn reset_config() -> bool {
    update_config(|current| *current = VisualMemoryConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let dir = tempdir()?;
        let manager = ConfigManager::load_from_file(dir.path().join("config.json"))?;
        assert_eq!(manager.config(), &VisualMemoryConfig::default());
        Ok(())
    }

    #[test]
    fn malformed_file_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json")?;
        assert!(ConfigManager::load_from_file(&path).is_err());
        Ok(())
    }

    #[test]
    fn save_preserves_unrelated_keys() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("config.json");
        fs::create_dir_all(dir.path().join("nested"))?;
        fs::write(
            &path,
            serde_json::to_string(&json!({
                "mcpServers": {"ocr": {"command": "python", "args": ["server.py"]}},
                "theme": "dark"
            }))?,
        )?;

        let mut manager = ConfigManager::load_from_file(&path)?;
        manager.update(|config| config.cache_max_entries = 7);
        manager.save()?;

        let written: Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(written["theme"], "dark");
        assert_eq!(written["visual_memory"]["cache_max_entries"], 7);
        assert_eq!(written["mcpServers"]["ocr"]["command"], "python");

        let reloaded = ConfigManager::load_from_file(&path)?;
        assert_eq!(reloaded.config().cache_max_entries, 7);
        Ok(())
    }

    #[test]
    fn set_value_parses_typed_and_string_values() -> Result<()> {
        let dir = tempdir()?;
        let mut manager = ConfigManager::load_from_file(dir.path().join("config.json"))?;

        manager.set_value("use_mock", "false")?;
        manager.set_value("remote_server_name", "local-ocr")?;
        manager.set_value("cache_max_size_mb", "12.5")?;

        assert!(!manager.config().use_mock);
        assert_eq!(manager.config().remote_server_name, "local-ocr");
        assert_eq!(manager.config().cache_max_size_mb, 12.5);

        assert!(manager.set_value("no_such_key", "1").is_err());
        assert!(manager.set_value("cache_max_entries", "many").is_err());

        manager.reset();
        assert_eq!(manager.config(), &VisualMemoryConfig::default());
        Ok(())
    }

    #[test]
    fn remote_server_requires_command_and_args() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            serde_json::to_string(&json!({
                "mcpServers": {
                    "good": {"command": "node", "args": ["ocr.js"]},
                    "broken": {"command": "node"}
                }
            }))?,
        )?;

        let manager = ConfigManager::load_from_file(&path)?;
        let good = manager.remote_server("good").expect("good server");
        assert_eq!(good.command, "node");
        assert_eq!(good.args, vec!["ocr.js".to_string()]);
        assert!(manager.remote_server("broken").is_none());
        assert!(manager.remote_server("absent").is_none());
        Ok(())
    }
}
