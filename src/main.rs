//! Entry point and runtime setup.

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;

mod app;
mod config;
mod events;
mod forms;
mod gateway;
mod input;
mod layout;
mod lookup;
mod records;
mod session;
mod shortcuts;
mod timer;
mod ui;
mod wizard;
mod worker;

/// Log to a file; the TUI owns stdout.
fn init_logging() -> Result<WorkerGuard> {
    // Log file lives next to config.toml.
    let log_file = "motor_works_tui.log";
    // Single file, never rotated.
    let file_appender = tracing_appender::rolling::never(".", log_file);
    // Writes happen on a background thread; the guard flushes on drop.
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    // Plain text, no colour codes, no module targets.
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to init logging: {e}"))?;
    // Record where the log goes.
    tracing::info!("logging to {}", log_file);
    Ok(guard)
}

#[tokio::main]
/// Entry point: logging, then the TUI, then terminal restore.
async fn main() -> Result<()> {
    // Keep the guard alive so buffered lines are flushed on exit.
    let _log_guard = init_logging()?;
    tracing::info!("app starting");
    // Switch the terminal into TUI mode.
    let mut terminal = ui::init_terminal()?;
    // Run until the user quits or a fatal error surfaces.
    let res = app::run_app(&mut terminal).await;
    // Always hand the terminal back, even after an error.
    ui::restore_terminal()?;
    // Keep the full error chain in the log.
    if let Err(ref e) = res {
        tracing::error!("app error: {e:#}");
    }
    tracing::info!("app exiting");
    res
}
