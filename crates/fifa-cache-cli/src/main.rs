//! fifa-cache - command line driver for the FIFA tracker offline cache.
//!
//! Each subcommand dispatches one lifecycle event to the cache manager,
//! backed by the on-disk cache and the real network.

mod args;
mod commands;

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use fifa_cache_core::{Config, DiskCacheStorage, HttpNetwork, LocalHost, OfflineCacheManager};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use args::{Cli, Commands};

/// Initialize the tracing subscriber for logging
fn init_tracing(verbose: u8) {
    // RUST_LOG wins; otherwise -v/-vv raise the default
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::config_path()?,
    };
    let config = Config::load_from(&config_path)?;
    let cache_dir = match cli.cache_dir {
        Some(dir) => dir,
        None => config.cache_dir()?,
    };
    info!(
        cache = %config.cache_name,
        origin = %config.origin,
        dir = %cache_dir.display(),
        "fifa-cache starting"
    );

    let storage = Arc::new(
        DiskCacheStorage::new(cache_dir)
            .await
            .context("Failed to open cache directory")?,
    );
    let network = Arc::new(HttpNetwork::new(&config.origin, config.request_timeout())?);
    let host = Arc::new(LocalHost::new());
    let manager = OfflineCacheManager::new(config, storage.clone(), network, host);

    match cli.command {
        Commands::Install => commands::install(&manager).await,
        Commands::Activate => commands::activate(&manager).await,
        Commands::Fetch(args) => {
            commands::fetch(&manager, &args.target, &args.method, args.document).await
        }
        Commands::Sync { tag } => commands::sync(&manager, &tag).await,
        Commands::Message { payload } => commands::message(&manager, &payload).await,
        Commands::Stores => commands::stores(&manager, &storage).await,
        Commands::Config { save } => commands::config(&manager, save.then_some(&config_path)),
    }
}
