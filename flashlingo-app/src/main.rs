mod cli;
mod config;
pub mod tui;
pub mod api;

use anyhow::Result;
use clap::Parser; // needed for Cli::parse()
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

use cli::opts::{Cli, Command};
use cli::commands::{run_cli, open_repo};
use config::AppConfig;
use tui::app::TuiApp;

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose, matches!(args.cmd, Command::Tui))?;
    let config = args.apply(AppConfig::load()?);

    match &args.cmd {
        // Run TUI on its own thread/runtime (no nested Tokio)
        Command::Tui => {
            let rt = Arc::new(Runtime::new()?);
            let repo = rt.block_on(open_repo(&config))?;
            let mut app = TuiApp::new(repo, config.user_id()?, rt);
            app.run()
        }
        // Everything else uses a single runtime here
        _ => {
            let rt = Runtime::new()?;
            rt.block_on(run_cli(args, config))
        }
    }
}

/// Logs go to stderr so command output stays pipeable. The TUI owns the
/// terminal, so its logs are discarded.
fn init_tracing(verbose: bool, tui: bool) -> Result<()> {
    let level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("FLASHLINGO_LOG").unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let res = if tui {
        builder.with_writer(std::io::sink).try_init()
    } else {
        builder.with_writer(std::io::stderr).try_init()
    };
    res.map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))
}
