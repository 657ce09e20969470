//! grabwire - bounded in-memory relay for browser-captured element records.
//!
//! Runs a single server process: browser-side producers attach over a
//! WebSocket and push captured element records in, and consumer tooling
//! queries them back over a small JSON API. Records live in memory only,
//! behind a hard capacity bound and a TTL, so the relay can sit in the
//! background of a debugging session without growing.
//!
//! See `grabwire --help` for the flags; everything else comes from
//! `~/.grabwire/config.toml`.

// Use mimalloc for better multi-core performance (especially important for musl builds)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::Parser;
use tracing::Level;

use grabwire::config::Config;
use grabwire::http;
use grabwire::logging::{LogConfig, LogFormat, init_logging};
use grabwire::metrics::init_metrics;

#[derive(Parser)]
#[command(name = "grabwire")]
#[command(version)]
#[command(about = "Bounded in-memory relay for browser-captured element records")]
struct Cli {
    /// Path to the config file (default: ~/.grabwire/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind host, overriding the config file
    #[arg(long)]
    host: Option<String>,

    /// Bind port, overriding the config file; repeat to give fallback candidates
    #[arg(short, long)]
    port: Vec<u16>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Enable debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_logging(&LogConfig::default().format(cli.log_format).level(level));
    init_metrics();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let mut config = Config::load(&config_path)?;

    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if !cli.port.is_empty() {
        config.server.ports = cli.port;
    }
    config.validate()?;

    http::serve(config).await?;
    Ok(())
}
