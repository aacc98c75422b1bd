use super::args::ConfigAction;
use anyhow::{Context, Result};
use console::style;
use recall_core::config::ConfigManager;

/// Handle the config command
pub fn handle_config_command(manager: &mut ConfigManager, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!(
                "{} {}",
                style("Configuration:").blue().bold(),
                manager.config_path().display()
            );
            let rendered = serde_json::to_string_pretty(manager.config())
                .context("Failed to serialize configuration")?;
            println!("{rendered}");
        }
        ConfigAction::Set { key, value } => {
            manager.set_value(&key, &value)?;
            manager.save()?;
            println!("{} {key} = {value}", style("✓ Updated").green());
        }
        ConfigAction::Reset => {
            manager.reset();
            manager.save()?;
            println!(
                "{} {}",
                style("✓ Restored defaults in").green(),
                manager.config_path().display()
            );
        }
    }
    Ok(())
}
