use anyhow::Result;
use console::style;
use recall_core::core::{VisualMemorySession, load_transcript, save_transcript};
use std::path::Path;

/// Handle the gc command
pub async fn handle_gc_command(
    session: &mut VisualMemorySession,
    transcript: &Path,
    output: Option<&Path>,
) -> Result<()> {
    for message in load_transcript(transcript)? {
        session.add_message(message);
    }

    let report = session.run_garbage_collection().await;
    let output = output.unwrap_or(transcript);
    save_transcript(output, &session.context.messages)?;

    println!(
        "{} {}/{} block(s), {} → {} messages, ~{} tokens saved",
        style("Compacted").green().bold(),
        report.blocks_compressed,
        report.blocks_found,
        report.messages_before,
        report.messages_after,
        report.tokens_saved
    );
    if report.failures > 0 {
        println!(
            "{} {} block(s) failed; see the log for details",
            style("warning:").yellow().bold(),
            report.failures
        );
    }
    println!("{} {}", style("Transcript:").dim(), output.display());
    println!();
    println!("{}", session.compression_status());
    Ok(())
}
