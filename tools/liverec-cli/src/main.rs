//! liverec CLI — record live broadcasts into segmented files.
//!
//! Usage:
//!   liverec record [OPTIONS]   Record one target, poll it, or watch followers
//!   liverec check              Check external tools and notification setup
//!   liverec config [--save]    Show or persist the effective configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use liverec_common::config::AppConfig;

mod commands;

use commands::record::RecordArgs;

#[derive(Parser)]
#[command(
    name = "liverec",
    about = "Record live broadcasts into time-bounded segments",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the standard location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a broadcast
    Record(RecordArgs),

    /// Check external tools and notification setup
    Check,

    /// Print the effective configuration
    Config {
        /// Write it to the config file
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load(),
    };

    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    liverec_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Record(args) => commands::record::run(config, args).await,
        Commands::Check => commands::check::run(&config),
        Commands::Config { save } => commands::config::run(&config, cli.config.as_deref(), save),
    }
}
