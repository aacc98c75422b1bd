use super::read_text;
use anyhow::{Context, Result, bail};
use console::style;
use recall_core::core::{VisualMemorySession, load_transcript};
use recall_core::visual::RenderedImage;
use std::path::{Path, PathBuf};

/// What the render command draws
#[derive(Debug)]
pub enum RenderSource {
    Text(String),
    File(PathBuf),
    Transcript(PathBuf),
}

impl RenderSource {
    pub fn from_args(
        text: Option<String>,
        file: Option<PathBuf>,
        transcript: Option<PathBuf>,
    ) -> Result<Self> {
        match (text, file, transcript) {
            (Some(text), _, _) => Ok(Self::Text(text)),
            (None, Some(file), _) => Ok(Self::File(file)),
            (None, None, Some(transcript)) => Ok(Self::Transcript(transcript)),
            (None, None, None) => bail!("Provide --text, --file or --transcript"),
        }
    }
}

/// Handle the render command
pub async fn handle_render_command(
    session: &VisualMemorySession,
    source: RenderSource,
    out_dir: &Path,
    no_highlight: bool,
) -> Result<()> {
    let renderer = session.compactor.renderer();
    let highlight = no_highlight.then_some(false);

    let images = match source {
        RenderSource::Transcript(path) => {
            let messages = load_transcript(&path)?;
            renderer.render_messages(&messages)?
        }
        RenderSource::Text(text) => renderer.render_conversation(&text, &[], highlight)?,
        RenderSource::File(path) => {
            let text = read_text(None, Some(&path)).await?;
            renderer.render_conversation(&text, &[], highlight)?
        }
    };

    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    println!(
        "{} {} page(s) with {}",
        style("Rendered").green().bold(),
        images.len(),
        renderer.font_name()
    );
    for (index, image) in images.iter().enumerate() {
        let path = out_dir.join(page_file_name(image, index));
        tokio::fs::write(&path, &image.image_bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("  {} ({:.1} KB)", path.display(), image.size_kb());
    }
    Ok(())
}

fn page_file_name(image: &RenderedImage, index: usize) -> String {
    let number = image.page_number().unwrap_or(index as u64 + 1);
    format!("page_{number:03}.{}", image.format.as_str().to_lowercase())
}
