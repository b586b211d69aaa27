//! Logging setup: stderr plus a per-session file.
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Platform-specific log directory.
///
/// - macOS: `~/Library/Caches/federation-shell/logs`
/// - Linux: `~/.cache/federation-shell/logs` (or `$XDG_CACHE_HOME/federation-shell/logs`)
/// - Windows: `%LOCALAPPDATA%\federation-shell\logs`
/// - Fallback: `/tmp/federation-shell/logs`
pub fn log_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "federation-shell")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/tmp/federation-shell"))
        .join("logs")
}

/// Install the global subscriber. Keep the returned guard alive for the
/// lifetime of the process or buffered file output is lost.
pub fn setup_logging(session_id: Option<String>) -> Result<WorkerGuard> {
    let session_id = session_id
        .unwrap_or_else(|| format!("session_{}", chrono::Local::now().format("%Y%m%d_%H%M%S")));

    let session_log_dir = log_dir().join(&session_id);
    std::fs::create_dir_all(&session_log_dir).with_context(|| {
        format!("Failed to create log directory: {}", session_log_dir.display())
    })?;

    let file_appender = tracing_appender::rolling::never(&session_log_dir, "shell.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!("Logging initialized: session={}", session_id);
    tracing::info!("Log file: {}/shell.log", session_log_dir.display());

    Ok(guard)
}
