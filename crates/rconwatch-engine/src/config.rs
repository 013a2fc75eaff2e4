//! Engine configuration, server state, and the daily restart window.

use std::fmt;
use std::time::Duration;

use chrono::{NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use rconwatch_tick::MissedTickPolicy;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Configuration for a status engine instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Time between scheduled polls. Zero means manual polls only.
    pub poll_interval: Duration,

    /// What to do with ticks that came due during a long poll.
    pub missed_tick_policy: MissedTickPolicy,

    /// Daily time at which the server is expected to restart.
    /// `None` disables restart handling.
    pub restart_window: Option<RestartWindow>,

    /// How long to wait after entering the restart window before the
    /// first re-check.
    pub restart_settle: Duration,

    /// Re-check cadence while the server is restarting.
    pub recheck_interval: Duration,

    /// Whether to poll once immediately when the engine starts.
    pub poll_on_start: bool,

    /// Bound on the engine's command channel.
    pub command_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(180),
            missed_tick_policy: MissedTickPolicy::Skip,
            restart_window: RestartWindow::new(7, 59),
            restart_settle: Duration::from_secs(60),
            recheck_interval: Duration::from_secs(30),
            poll_on_start: true,
            command_buffer: 32,
        }
    }
}

// ---------------------------------------------------------------------------
// ServerState
// ---------------------------------------------------------------------------

/// What the engine currently believes about the remote server.
///
/// ```text
/// Offline ⇄ Online          (poll fails / poll succeeds)
/// Offline | Online → Restarting   (restart window minute)
/// Restarting → Online       (re-check succeeds)
/// ```
///
/// - **Online**: the last poll returned a roster (possibly empty).
/// - **Offline**: the last poll failed after all retries.
/// - **Restarting**: inside the daily restart window. Normal polling is
///   paused and a fast re-check runs until the server answers again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerState {
    Online,
    Offline,
    Restarting,
}

impl ServerState {
    /// Returns `true` while the engine is waiting out a restart.
    pub fn is_restarting(&self) -> bool {
        matches!(self, Self::Restarting)
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Online => write!(f, "online"),
            Self::Offline => write!(f, "offline"),
            Self::Restarting => write!(f, "restarting"),
        }
    }
}

// ---------------------------------------------------------------------------
// RestartWindow
// ---------------------------------------------------------------------------

/// A daily local wall-clock minute, e.g. `07:59`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RestartWindow {
    at: NaiveTime,
}

impl RestartWindow {
    /// Returns `None` if `hour > 23` or `minute > 59`.
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(|at| Self { at })
    }

    /// Hour of the window, `0..=23`.
    pub fn hour(&self) -> u32 {
        self.at.hour()
    }

    /// Minute of the window, `0..=59`.
    pub fn minute(&self) -> u32 {
        self.at.minute()
    }

    /// Whether `now` falls inside the window minute.
    pub fn matches(&self, now: NaiveDateTime) -> bool {
        now.hour() == self.hour() && now.minute() == self.minute()
    }

    /// The first start of the window strictly after `now`.
    pub fn next_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.at);
        if today > now {
            today
        } else {
            today + TimeDelta::days(1)
        }
    }

    /// Time from `now` until the next start of the window.
    pub fn duration_until(&self, now: NaiveDateTime) -> Duration {
        (self.next_after(now) - now).to_std().unwrap_or_default()
    }
}

impl fmt::Display for RestartWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}
