//! Status daemon for a single game server.
//!
//! Reads `RCON_IP`, `RCON_PORT` and `RCON_PASSWORD` (plus the optional
//! `RCONWATCH_*` knobs) from the environment, then prints one JSON line per
//! status change. `SIGUSR1` forces a poll; Ctrl-C exits.

use std::process::ExitCode;

use rconwatch::prelude::*;
use tracing::{error, info, warn};

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Logs each update and writes it to stdout as a JSON line.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn publish(&self, update: StatusUpdate) {
        match &update.roster {
            Some(roster) => info!(
                state = %update.state,
                players = roster.len(),
                names = ?roster.names(),
                "server status"
            ),
            None => info!(state = %update.state, "server status"),
        }

        match serde_json::to_string(&update) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(error = %e, "could not encode status update"),
        }
    }
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

#[cfg(unix)]
struct PollRequests(tokio::signal::unix::Signal);

#[cfg(unix)]
impl PollRequests {
    fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};
        signal(SignalKind::user_defined1()).map(Self)
    }

    async fn next(&mut self) -> Option<()> {
        self.0.recv().await
    }
}

#[cfg(not(unix))]
struct PollRequests;

#[cfg(not(unix))]
impl PollRequests {
    fn install() -> std::io::Result<Self> {
        Ok(Self)
    }

    async fn next(&mut self) -> Option<()> {
        std::future::pending().await
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    init_logging("info");

    let config = match MonitorConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let mut poll_requests = match PollRequests::install() {
        Ok(requests) => requests,
        Err(e) => {
            error!(error = %e, "could not install SIGUSR1 handler");
            return ExitCode::FAILURE;
        }
    };

    let monitor = StatusMonitor::start(config, ConsoleNotifier);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("interrupt received");
                break;
            }
            Some(()) = poll_requests.next() => {
                let monitor = monitor.clone();
                tokio::spawn(async move {
                    match monitor.poll_now().await {
                        Ok(state) => info!(%state, "manual poll finished"),
                        Err(e) => warn!(error = %e, "manual poll failed"),
                    }
                });
            }
        }
    }

    if let Err(e) = monitor.shutdown().await {
        warn!(error = %e, "monitor already stopped");
    }
    ExitCode::SUCCESS
}
