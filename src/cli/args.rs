//! CLI argument parsing

use clap::{Parser, Subcommand, ValueHint};
use std::path::PathBuf;

/// Visual memory for long agent conversations
#[derive(Parser, Debug)]
#[command(
    name = "recall",
    version,
    about = "Visual memory for agent conversations\n\nOld turns are rendered to square pages, compressed into visual tokens and cached so they can be expanded again on demand.\n\nQuick Start:\n  recall compress --file notes.txt --id turn_1\n  recall decompress turn_1"
)]
pub struct Cli {
    /// Config file; defaults to `$RECALL_HOME/config.json` or `~/.recall/config.json`
    #[arg(long, global = true, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Use the simulator regardless of the configured mode
    #[arg(long, global = true, conflicts_with = "remote")]
    pub mock: bool,

    /// Use the remote OCR service regardless of the configured mode
    #[arg(long, global = true)]
    pub remote: bool,

    /// Debug logging (overridden by `RUST_LOG`)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compress text into visual memory under the given message ids
    Compress {
        /// Text to compress
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,

        /// Read the text from a file
        #[arg(long, value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,

        /// Message id the memory is stored under (repeatable, order matters)
        #[arg(long = "id", value_name = "ID", required = true)]
        ids: Vec<String>,
    },

    /// Expand the visual memory stored for the given message ids
    Decompress {
        #[arg(required = true, value_name = "ID")]
        ids: Vec<String>,
    },

    /// Show cache and compression statistics
    Stats,

    /// Render text or a transcript to page images
    Render {
        /// Text to render
        #[arg(long, conflicts_with_all = ["file", "transcript"])]
        text: Option<String>,

        /// Read the text from a file
        #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "transcript")]
        file: Option<PathBuf>,

        /// Render a JSON transcript (array of messages)
        #[arg(long, value_hint = ValueHint::FilePath)]
        transcript: Option<PathBuf>,

        /// Directory the pages are written to
        #[arg(long, short, default_value = ".", value_hint = ValueHint::DirPath)]
        out_dir: PathBuf,

        /// Disable syntax highlighting
        #[arg(long)]
        no_highlight: bool,
    },

    /// Check that the active compression backend responds
    Health,

    /// Inspect or edit the visual memory configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Compress old turns of a transcript and write the rewritten transcript
    Gc {
        /// JSON transcript to compact
        #[arg(value_hint = ValueHint::FilePath)]
        transcript: PathBuf,

        /// Where to write the result; defaults to overwriting the input
        #[arg(long, short, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Set one field, e.g. `recall config set cache_max_entries 20`
    Set { key: String, value: String },
    /// Restore the defaults
    Reset,
}
