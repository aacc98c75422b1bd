use anyhow::{Result, bail};
use console::style;
use recall_core::core::VisualMemorySession;

/// Handle the health command
pub async fn handle_health_command(session: &VisualMemorySession) -> Result<()> {
    let client = session.compactor.client();
    println!("{} {}", style("Mode:").bold(), client.mode_label());
    println!(
        "{} {}",
        style("Remote server:").bold(),
        if client.has_remote() {
            session.config().remote_server_name.as_str()
        } else {
            "not configured"
        }
    );

    if client.health_check().await {
        println!("{}", style("✓ Compression backend is healthy").green());
        Ok(())
    } else {
        bail!("compression backend did not report healthy")
    }
}
