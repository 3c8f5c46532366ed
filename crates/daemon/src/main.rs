//! zotsync daemon entry point.
//!
//! Loads configuration, builds the sync engine, and either runs a single
//! pass (`--once`) or polls forever until SIGINT/SIGTERM.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use zotsync_core::{build_http_engine, SyncConfig, SyncPass};
use zotsync_daemon::config_path::resolve_config_path;
use zotsync_daemon::scheduler::SyncScheduler;
use zotsync_daemon::signals::setup_signal_handlers;

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// One-way Zotero → reMarkable PDF sync daemon.
#[derive(Parser, Debug)]
#[command(
    name = "zotsync-daemon",
    version,
    about = "Pushes PDFs from Zotero collections into same-named reMarkable folders"
)]
struct Args {
    /// Path to the TOML configuration file (default: <config dir>/zotsync/config.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the log level from the config file (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Run a single sync pass and exit; exits non-zero if the pass fails.
    #[arg(long)]
    once: bool,

    /// Print a commented configuration template and exit.
    #[arg(long)]
    print_config_template: bool,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config_template {
        print!("{}", SyncConfig::default_template());
        return Ok(());
    }

    // Load and resolve configuration
    let config_path = resolve_config_path(args.config.clone());
    let config = SyncConfig::load_and_resolve(config_path.as_deref())
        .context("failed to load configuration")?;

    // Initialize tracing
    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.daemon.log_level);

    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .init();

    // Startup banner
    info!("========================================");
    info!("  zotsync daemon v{}", env!("CARGO_PKG_VERSION"));
    info!("========================================");
    match &config_path {
        Some(path) => info!("Config file   : {}", path.display()),
        None => info!("Config file   : (built-in defaults)"),
    }
    info!("Zotero API    : {}", config.zotero.api_url);
    info!("Library dir   : {}", config.tablet.library_dir.display());
    info!("Upload URL    : {}", config.tablet.upload_url);
    info!("Sync interval : {}s", config.schedule.sync_interval_secs);
    info!("Poll interval : {}s", config.schedule.poll_interval_secs);
    info!("HTTP timeout  : {}s", config.http.request_timeout_secs);
    info!("Log level     : {}", log_level);
    info!("========================================");

    let engine = build_http_engine(&config).context("failed to initialize sync engine")?;

    if args.once {
        let stats = engine.run_pass().await.context("sync pass failed")?;
        info!(
            transferred = stats.files_transferred,
            bytes = stats.bytes_transferred,
            "single pass finished"
        );
        return Ok(());
    }

    let shutdown = setup_signal_handlers().context("failed to register signal handlers")?;
    let mut scheduler = SyncScheduler::from_config(&config.schedule);
    scheduler.run(&engine, &shutdown).await;

    info!("zotsync daemon stopped.");
    Ok(())
}
