//! Slate CLI - scan photo directories into slates and prepare gallery data.
//!
//! # Usage
//!
//! ```bash
//! # Scan (or load from cache) two photo directories together
//! slate scan ~/Photos/2023 ~/Photos/2024
//!
//! # Generate thumbnails and gallery.json for selected slates
//! slate generate ~/Photos/2024 --thumbnails --slate trip --slate trip/day1
//!
//! # Inspect the cache
//! slate cache status ~/Photos/2024
//!
//! # View configuration
//! slate config show
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;

/// Slate - photo directory scanner and gallery builder.
#[derive(Parser, Debug)]
#[command(name = "slate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "SLATE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan directories into slates and refresh the cache
    Scan(cli::scan::ScanArgs),

    /// Build thumbnails, histograms and gallery.json
    Generate(cli::generate::GenerateArgs),

    /// Inspect or clear scan caches
    Cache(cli::cache::CacheArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(slate_core::Config::default_path);

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let loaded = if config_path.exists() {
        slate_core::Config::load_from(&config_path)
    } else {
        Ok(slate_core::Config::default())
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `slate config path`."
            );
            slate_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Slate v{}", slate_core::VERSION);

    match cli.command {
        Commands::Scan(args) => cli::scan::execute(args, config).await,
        Commands::Generate(args) => cli::generate::execute(args, config).await,
        Commands::Cache(args) => cli::cache::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args, config, &config_path).await,
    }
}
