//! Status engine for rconwatch.
//!
//! The engine runs as an isolated Tokio task (actor model) that owns the
//! server state, the poll timers, and the single in-flight poll.
//!
//! # Key types
//!
//! - [`spawn_engine`] — starts the actor
//! - [`EngineHandle`] — manual polls, status queries, shutdown
//! - [`ServerState`] — online / offline / restarting
//! - [`EngineConfig`] — poll interval, restart window, re-check cadence
//! - [`Notifier`] — where state changes are published
//! - [`Clock`] — local wall time, for the restart window

mod clock;
mod config;
mod engine;
mod error;
mod notifier;

pub use clock::{Clock, SystemClock};
pub use config::{EngineConfig, RestartWindow, ServerState};
pub use engine::{EngineHandle, EngineStatus, spawn_engine};
pub use error::EngineError;
pub use notifier::{ChannelNotifier, Notifier, StatusUpdate};
