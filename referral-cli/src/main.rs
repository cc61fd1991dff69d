use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

use config::ConfigLoader;

#[derive(Parser)]
#[command(name = "referral", about = "Launch attribution replay and deep-link routing")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the user and project config
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scripted launch scenario
    Replay(commands::replay::ReplayArgs),
    /// Resolve a launch URI to a deep-link target
    Route(commands::route::RouteArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ConfigLoader::load(cli.config.as_deref())?;

    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        config
            .logging
            .level
            .clone()
            .unwrap_or_else(|| "info".to_string())
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Replay(args) => commands::replay::run(args, &config).await,
        Commands::Route(args) => commands::route::run(args, &config),
    }
}
