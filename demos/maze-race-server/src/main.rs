//! Runs a Maze Race server.
//!
//! ```text
//! maze-race-server [config.json]
//! ```
//!
//! Logging follows `RUST_LOG` (default `info`). Ctrl-C shuts down
//! gracefully. On Unix, `SIGUSR1` toggles verbose logging and `SIGUSR2`
//! logs the current counters.

use mazerace::prelude::*;
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

/// Per-packet detail plus a board picture after every move.
const VERBOSE_FILTER: &str = "debug,mazerace_race=trace";

fn quiet_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn filter_for(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        quiet_filter()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => ServerConfig::from_json_file(path)?,
        None => ServerConfig::default(),
    };

    let (filter, filter_handle) = reload::Layer::new(filter_for(config.verbose));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let server = MazeRaceServer::builder()
        .config(config)
        .on_verbosity_change(move |verbose| {
            if let Err(e) = filter_handle.reload(filter_for(verbose)) {
                tracing::warn!(error = %e, "failed to reload log filter");
            }
        })
        .build()
        .await?;

    let handle = server.handle();
    tokio::spawn(async move {
        if let Err(e) = watch_signals(handle).await {
            tracing::error!(error = %e, "signal handling failed");
        }
    });

    server.run().await?;
    Ok(())
}

#[cfg(unix)]
async fn watch_signals(handle: ServerHandle) -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut toggle = signal(SignalKind::user_defined1())?;
    let mut report = signal(SignalKind::user_defined2())?;
    loop {
        tokio::select! {
            interrupted = tokio::signal::ctrl_c() => {
                interrupted?;
                tracing::info!("interrupt received");
                handle.shutdown();
                return Ok(());
            }
            _ = toggle.recv() => handle.set_verbose(!handle.is_verbose()),
            _ = report.recv() => {
                let stats = handle.stats();
                tracing::info!(
                    total_connections = stats.total_connections,
                    active_connections = stats.active_connections,
                    total_sessions = stats.total_sessions,
                    active_sessions = stats.active_sessions,
                    queued = stats.queued,
                    "server stats"
                );
            }
        }
    }
}

#[cfg(not(unix))]
async fn watch_signals(handle: ServerHandle) -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!("interrupt received");
    handle.shutdown();
    Ok(())
}
