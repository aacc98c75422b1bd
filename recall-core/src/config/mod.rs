//! Configuration for visual memory
//!
//! Settings live in `~/.recall/config.json` (or `$RECALL_HOME/config.json`)
//! under a `visual_memory` key. Every field has a default, so a partial or
//! missing file is always usable.

pub mod constants;
pub mod loader;
pub mod render;
pub mod visual_memory;

pub use loader::{
    ConfigManager, RemoteServerConfig, default_config_path, load_config, recall_home, reset_config,
    save_config, update_config,
};
pub use render::{PageFormat, RenderConfig, Rgb};
pub use visual_memory::VisualMemoryConfig;
