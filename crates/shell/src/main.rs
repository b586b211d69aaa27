//! Composition root for the federated bundles.
//!
//! Publishes the container and remote bundles as local deployments and renders
//! the container page, which loads `remote/TestPage` at runtime.
//! Run with: `cargo run -p shell -- <command>`
mod commands;
mod logging;

use anyhow::Result;
use clap::Parser;
use commands::{Publish, Run};

/// Runtime module federation shell
#[derive(Parser)]
#[command(name = "federation-shell")]
#[command(about = "Publish and compose federated bundles", long_about = None)]
#[command(version)]
struct Cli {
    /// Session identifier for the log directory (default: timestamp)
    #[arg(long, global = true)]
    session: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Write manifests and entries for every bundle
    Publish(Publish),

    /// Publish locally, then render the container page
    Run(Run),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = logging::setup_logging(cli.session)?;

    match cli.command {
        Command::Publish(cmd) => cmd.execute(),
        Command::Run(cmd) => cmd.execute().await,
    }
}
