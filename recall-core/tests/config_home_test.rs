//! Exercises the default-location helpers; kept to a single test because it
//! sets `RECALL_HOME` for the whole process.

use anyhow::Result;
use recall_core::config::{
    default_config_path, load_config, recall_home, reset_config, save_config, update_config,
};
use std::fs;
use tempfile::tempdir;

#[test]
fn helpers_follow_recall_home() -> Result<()> {
    let dir = tempdir()?;
    // SAFETY: no other test in this binary reads or writes the environment.
    unsafe { std::env::set_var("RECALL_HOME", dir.path()) };

    assert_eq!(recall_home(), dir.path());
    assert_eq!(default_config_path(), dir.path().join("config.json"));
    assert!(load_config().use_mock);

    fs::write(default_config_path(), r#"{"mcpServers": {}}"#)?;
    assert!(update_config(|config| config.cache_max_entries = 7));
    assert_eq!(load_config().cache_max_entries, 7);

    let mut config = load_config();
    config.use_mock = false;
    assert!(save_config(&config));
    assert!(!load_config().use_mock);

    assert!(reset_config());
    assert_eq!(load_config().cache_max_entries, 50);
    let document: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(default_config_path())?)?;
    assert!(document.get("mcpServers").is_some());

    // SAFETY: as above.
    unsafe { std::env::remove_var("RECALL_HOME") };
    Ok(())
}
