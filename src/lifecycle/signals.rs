//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGINT or SIGTERM
//! - Report which one arrived
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Non-unix targets only get Ctrl+C

use std::io;

/// Block until the process is asked to stop, returning the signal name.
#[cfg(unix)]
pub async fn wait_for_shutdown() -> io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    let name = tokio::select! {
        _ = interrupt.recv() => "SIGINT",
        _ = terminate.recv() => "SIGTERM",
    };
    tracing::info!(signal = name, "Shutdown signal received");
    Ok(name)
}

/// Block until the process is asked to stop, returning the signal name.
#[cfg(not(unix))]
pub async fn wait_for_shutdown() -> io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    tracing::info!(signal = "ctrl_c", "Shutdown signal received");
    Ok("ctrl_c")
}
