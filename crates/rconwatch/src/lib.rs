//! # rconwatch
//!
//! Game-server status monitoring over RCON.
//!
//! rconwatch periodically logs in to a game server's remote console, asks
//! who is connected, and turns the answer into a small state machine:
//! online with a roster, offline, or restarting during a known daily
//! window. State changes go to a [`Notifier`](prelude::Notifier) of your
//! choice.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rconwatch::prelude::*;
//!
//! # async fn run() -> Result<(), RconwatchError> {
//! init_logging("info");
//!
//! let (notifier, mut updates) = ChannelNotifier::new();
//! let monitor = StatusMonitor::from_env(notifier)?;
//!
//! while let Some(update) = updates.recv().await {
//!     println!("{} ({} players)", update.state, update.roster.map_or(0, |r| r.len()));
//! }
//! monitor.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod logging;
mod monitor;

pub use config::{ConfigError, MonitorConfig};
pub use error::RconwatchError;
pub use logging::init_logging;
pub use monitor::StatusMonitor;

/// Environment variable names read by [`MonitorConfig::from_env`].
pub mod env {
    pub use crate::config::{
        ATTEMPT_TIMEOUT_MS, POLL_INTERVAL_SECS, RCON_IP, RCON_PASSWORD, RCON_PORT,
        RECHECK_INTERVAL_SECS, RESPONSE_TIMEOUT_MS, RESTART_SETTLE_SECS, RESTART_TIME,
        RETRY_ATTEMPTS, RETRY_BACKOFF_MS, SETTLE_DELAY_MS,
    };
}

pub mod prelude {
    pub use crate::{ConfigError, MonitorConfig, RconwatchError, StatusMonitor, init_logging};
    pub use rconwatch_engine::{
        ChannelNotifier, Clock, EngineConfig, EngineError, EngineHandle, EngineStatus, Notifier,
        RestartWindow, ServerState, StatusUpdate, SystemClock,
    };
    pub use rconwatch_protocol::{PlayerRecord, RosterSnapshot};
    pub use rconwatch_session::{PollOutcome, RetryPolicy, SessionConfig, TransportSession};
}
