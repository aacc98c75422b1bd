//! `recall` command-line entry point

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose);

    let mut manager = cli::load_manager(args.config.as_deref())?;

    match args.command {
        Commands::Config { action } => cli::handle_config_command(&mut manager, action),
        Commands::Compress { text, file, ids } => {
            let mut session = cli::open_session(&manager, args.mock, args.remote);
            cli::handle_compress_command(&mut session, text, file, ids).await
        }
        Commands::Decompress { ids } => {
            let mut session = cli::open_session(&manager, args.mock, args.remote);
            cli::handle_decompress_command(&mut session, ids).await
        }
        Commands::Stats => {
            let mut session = cli::open_session(&manager, args.mock, args.remote);
            cli::handle_stats_command(&mut session).await
        }
        Commands::Render {
            text,
            file,
            transcript,
            out_dir,
            no_highlight,
        } => {
            let session = cli::open_session(&manager, args.mock, args.remote);
            let source = cli::RenderSource::from_args(text, file, transcript)?;
            cli::handle_render_command(&session, source, &out_dir, no_highlight).await
        }
        Commands::Health => {
            let session = cli::open_session(&manager, args.mock, args.remote);
            cli::handle_health_command(&session).await
        }
        Commands::Gc { transcript, output } => {
            let mut session = cli::open_session(&manager, args.mock, args.remote);
            cli::handle_gc_command(&mut session, &transcript, output.as_deref()).await
        }
    }
}

/// Logs go to stderr so command output on stdout stays clean
fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "recall=debug,recall_core=debug"
    } else {
        "recall=info,recall_core=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
