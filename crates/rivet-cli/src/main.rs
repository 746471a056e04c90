//! Rivet CLI - Mirror directories to and from a Girder server
//!
//! Provides commands for:
//! - Uploading a local directory tree into a Girder folder
//! - Downloading a Girder folder tree into a local directory
//! - Saving a default server profile

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rivet_core::config::Config;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    configure::ConfigureCommand, download::DownloadCommand, sync::SyncCommand, Context,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "rivet", version, about = "Mirror directories to and from Girder")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Girder server URL
    #[arg(long, env = "RIVET_URL", global = true)]
    url: Option<String>,

    /// Credential: username:password, API key, or token
    #[arg(long, env = "RIVET_AUTH", global = true, hide_env_values = true)]
    auth: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Upload a local directory into a Girder folder
    Sync(SyncCommand),
    /// Download a Girder folder into a local directory
    Download(DownloadCommand),
    /// Validate and save the default server profile
    Configure(ConfigureCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path);

    // Setup tracing
    let filter = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let ctx = Context {
        format: OutputFormat::from_flag(cli.json),
        config_path,
        config,
        url: cli.url,
        auth: cli.auth,
    };

    match cli.command {
        Commands::Sync(cmd) => cmd.execute(&ctx).await,
        Commands::Download(cmd) => cmd.execute(&ctx).await,
        Commands::Configure(cmd) => cmd.execute(&ctx).await,
    }
}
