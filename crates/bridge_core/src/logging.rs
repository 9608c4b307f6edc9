use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::BridgeConfig;

const LOG_FILE_PREFIX: &str = "tribridge";

/// Crates whose state transitions are worth keeping at debug level.
const DEBUG_CRATES: [&str; 2] = ["bridge_session", "bridge_chains"];

/// Filter used when `RUST_LOG` is unset: the configured level for everything,
/// debug for the bridge crates.
pub fn default_filter(level: &str) -> String {
    let mut directives = vec![level.trim().to_string()];
    directives.extend(DEBUG_CRATES.iter().map(|c| format!("{c}=debug")));
    directives.join(",")
}

/// Install file + console logging under `~/.tribridge/logs`.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// whole session.
pub fn init_logging(config: &BridgeConfig) -> Result<WorkerGuard> {
    let logs_dir = BridgeConfig::logs_dir()?;
    install(&logs_dir, &default_filter(&config.log_level), true)
}

/// File-only logging in `logs_dir`, for tests and embedding hosts.
pub fn init_logging_to_dir(logs_dir: &Path, filter: &str) -> Result<WorkerGuard> {
    install(logs_dir, filter, false)
}

fn install(logs_dir: &Path, fallback_filter: &str, console: bool) -> Result<WorkerGuard> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("Failed to create logs dir {}", logs_dir.display()))?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX));
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback_filter))
        .with_context(|| format!("Invalid log filter: {fallback_filter}"))?;

    let file = fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .with_writer(writer);
    let console = console.then(|| fmt::layer().with_target(false).compact());

    tracing_subscriber::registry()
        .with(filter)
        .with(file)
        .with(console)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}
