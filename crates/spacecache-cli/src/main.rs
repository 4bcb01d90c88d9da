//! spacecache - a caching command line client for the SpaceTraders API.
//!
//! Every read goes through the local cache, so repeated commands cost no
//! requests against the rate-limited API until the cached data goes stale.

mod commands;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use spacecache_core::{ApiClient, CacheManager, CacheStore, Config};

use commands::TopCommand;

/// Directory for an optional log file, in addition to stderr
const LOG_DIR_ENV: &str = "SPACECACHE_LOG_DIR";

const LOG_FILE: &str = "spacecache.log";

#[derive(Parser)]
#[command(name = "spacecache", version, about = "Caching command line client for the SpaceTraders API")]
struct Cli {
    #[command(subcommand)]
    command: TopCommand,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Agent token (overrides SPACECACHE_TOKEN, ST_TOKEN and the config file)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Cache file to use instead of the configured one
    #[arg(long, global = true)]
    cache_file: Option<PathBuf>,
}

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the log file on drop and must be held until exit.
fn init_tracing(verbose: bool) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let (file_layer, guard) = match std::env::var_os(LOG_DIR_ENV) {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(Path::new(&dir), LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.verbose);

    let config = Config::load().context("Failed to load configuration")?;
    let command = match cli.command {
        TopCommand::Config { action } => return commands::run_config(config, action),
        TopCommand::Api(command) => command,
    };

    let cache_file = match cli.cache_file {
        Some(path) => path,
        None => config.cache_file()?,
    };
    info!(cache_file = %cache_file.display(), "spacecache starting");

    let mut client = ApiClient::new(config.base_url()).context("Failed to build HTTP client")?;
    match config.resolve_token(cli.token.as_deref()) {
        Some(token) => client.set_token(token),
        None => warn!("No agent token configured; only public endpoints will work"),
    }

    let cache = CacheManager::new(CacheStore::new(cache_file), client);
    commands::run(&cache, command).await
}
