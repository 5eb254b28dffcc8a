//! The `slate cache` command for inspecting and clearing scan caches.

use clap::{Args, Subcommand};
use slate_core::{CacheStatus, CacheStore, Config};
use std::path::PathBuf;

/// Arguments for the `cache` command.
#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

/// Subcommands for cache management.
#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show whether the cache for a set of directories is usable
    Status {
        #[arg(required = true)]
        roots: Vec<PathBuf>,

        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete the cache for a set of directories, or every cache
    Clear {
        #[arg(required_unless_present = "all")]
        roots: Vec<PathBuf>,

        /// Delete all cache files
        #[arg(long, conflicts_with = "roots")]
        all: bool,
    },

    /// List cache files
    List,
}

/// Execute the cache command.
pub async fn execute(args: CacheArgs, config: Config) -> anyhow::Result<()> {
    let store = CacheStore::new(config.cache_dir());

    match args.command {
        CacheCommand::Status { roots, json } => {
            let status = store.status(&roots);
            let path = store.cache_path(&roots);
            let (state, reason) = match &status {
                CacheStatus::Valid => ("valid", None),
                CacheStatus::Stale(reason) => ("stale", Some(reason.to_string())),
                CacheStatus::Missing => ("missing", None),
            };
            if json {
                let value = serde_json::json!({
                    "status": state,
                    "reason": reason,
                    "path": path,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                match reason {
                    Some(reason) => println!("{state}: {reason}"),
                    None => println!("{state}"),
                }
                println!("{}", path.display());
            }
        }

        CacheCommand::Clear { roots, all } => {
            if all {
                let removed = store.clear_all()?;
                println!("Removed {removed} cache files from {}", store.dir().display());
            } else if store.clear(&roots)? {
                println!("Removed {}", store.cache_path(&roots).display());
            } else {
                println!("No cache for these directories");
            }
        }

        CacheCommand::List => {
            for path in store.entries() {
                println!("{}", path.display());
            }
        }
    }

    Ok(())
}
