//! Poll timers for rconwatch.
//!
//! Two timers drive the status engine:
//!
//! - [`PollTimer`] — the normal fixed-interval tick, with a policy for
//!   ticks that were missed while a long poll was running, and pause/resume
//!   for the restart window.
//! - [`OneShotTimer`] — a single cancellable deadline. The engine uses one
//!   for fast re-checks during a restart and one for the daily restart
//!   window itself.
//!
//! # Manual-only mode
//!
//! When the poll interval is zero, [`PollTimer::wait_for_tick`] pends
//! forever. Polls then only happen when something asks for one.
//!
//! # Integration
//!
//! Both timers are designed to sit inside the engine actor's `tokio::select!`
//! loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         _ = ticker.wait_for_tick() => { /* start a poll */ }
//!         _ = recheck.wait() => { /* fast re-check */ }
//!     }
//! }
//! ```
//!
//! Both `wait` methods are cancel-safe: dropping the future before it
//! resolves leaves the timer unchanged.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when a tick comes due while the previous poll is still
/// running (or the task was otherwise late to wake).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissedTickPolicy {
    /// Fire once for all missed ticks and schedule the next one a full
    /// interval from now.
    #[default]
    Skip,
    /// Fire once and keep the original cadence. The next tick lands on the
    /// first grid point after now.
    Drop,
}

/// Configuration for the poll timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTimerConfig {
    /// Time between ticks. Zero means manual-only (tick never fires).
    pub interval: Duration,
    /// Missed-tick handling.
    pub policy: MissedTickPolicy,
}

impl Default for PollTimerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(180),
            policy: MissedTickPolicy::default(),
        }
    }
}

impl PollTimerConfig {
    /// A config for a specific interval with the default policy.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Tick info (returned to caller each tick)
// ---------------------------------------------------------------------------

/// Information about a tick, returned by [`PollTimer::wait_for_tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickInfo {
    /// Monotonically increasing tick number (starts at 1).
    pub tick: u64,
    /// `true` if this tick fired a full interval or more late.
    pub overrun: bool,
    /// How many whole intervals were swallowed by this tick.
    pub ticks_skipped: u64,
}

// ---------------------------------------------------------------------------
// PollTimer
// ---------------------------------------------------------------------------

/// Fixed-interval tick for normal polls.
#[derive(Debug)]
pub struct PollTimer {
    config: PollTimerConfig,
    interval: Option<Duration>,
    tick_count: u64,
    total_skipped: u64,
    next_tick: Option<Instant>,
    paused: bool,
}

impl PollTimer {
    /// Creates a timer. The first tick is due one interval from now.
    pub fn new(config: PollTimerConfig) -> Self {
        let interval = (!config.interval.is_zero()).then_some(config.interval);
        let next_tick = interval.map(|d| Instant::now() + d);

        match interval {
            Some(d) => debug!(
                interval_secs = d.as_secs_f64(),
                policy = ?config.policy,
                "poll timer created"
            ),
            None => debug!("poll timer created in manual-only mode"),
        }

        Self {
            config,
            interval,
            tick_count: 0,
            total_skipped: 0,
            next_tick,
            paused: false,
        }
    }

    /// Creates a timer for a specific interval with default settings.
    pub fn with_interval(interval: Duration) -> Self {
        Self::new(PollTimerConfig::with_interval(interval))
    }

    /// Waits until the next tick is due.
    ///
    /// In manual-only mode or while paused this future never resolves,
    /// which lets `tokio::select!` keep serving its other branches.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let (next, interval) = match (self.next_tick, self.interval) {
            (Some(next), Some(interval)) if !self.paused => (next, interval),
            _ => std::future::pending().await,
        };

        time::sleep_until(next).await;

        let now = Instant::now();
        self.tick_count += 1;

        let late_by = now.saturating_duration_since(next);
        let ticks_skipped = (late_by.as_nanos() / interval.as_nanos()) as u64;
        let overrun = ticks_skipped > 0;

        self.next_tick = Some(match self.config.policy {
            MissedTickPolicy::Skip => now + interval,
            MissedTickPolicy::Drop => next + interval * (ticks_skipped as u32 + 1),
        });

        if overrun {
            self.total_skipped += ticks_skipped;
            warn!(
                tick = self.tick_count,
                skipped = ticks_skipped,
                late_secs = late_by.as_secs_f64(),
                policy = ?self.config.policy,
                "poll tick overrun"
            );
        }
        trace!(tick = self.tick_count, overrun, "poll tick fired");

        TickInfo {
            tick: self.tick_count,
            overrun,
            ticks_skipped,
        }
    }

    /// Pauses the timer. `wait_for_tick` pends until [`resume`](Self::resume).
    ///
    /// Safe to call multiple times (idempotent).
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.tick_count, "poll timer paused");
        }
    }

    /// Resumes after a pause. The next tick is a full interval from now,
    /// so time spent paused never produces a burst of ticks.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            if let Some(interval) = self.interval {
                self.next_tick = Some(Instant::now() + interval);
            }
            debug!(tick = self.tick_count, "poll timer resumed");
        }
    }

    /// Whether the timer is currently paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether the timer never fires (interval of zero).
    pub fn is_manual_only(&self) -> bool {
        self.interval.is_none()
    }

    /// Ticks fired so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Total intervals swallowed by overruns.
    pub fn total_skipped(&self) -> u64 {
        self.total_skipped
    }

    /// The configured interval, or `None` in manual-only mode.
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// When the next tick is due, if one is scheduled and not paused.
    pub fn next_tick(&self) -> Option<Instant> {
        self.next_tick.filter(|_| !self.paused)
    }
}

// ---------------------------------------------------------------------------
// OneShotTimer
// ---------------------------------------------------------------------------

/// A single cancellable deadline.
///
/// Disarmed timers pend forever. Firing disarms the timer, so each
/// [`arm`](Self::arm) produces at most one wake-up.
#[derive(Debug, Default)]
pub struct OneShotTimer {
    deadline: Option<Instant>,
}

impl OneShotTimer {
    /// A disarmed timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the timer to fire after `delay`, replacing any pending deadline.
    pub fn arm(&mut self, delay: Duration) {
        self.deadline = Some(Instant::now() + delay);
    }

    /// Disarms the timer. Returns `true` if a deadline was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Whether a deadline is pending.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// The pending deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Waits for the deadline, then disarms.
    pub async fn wait(&mut self) {
        let Some(deadline) = self.deadline else {
            return std::future::pending().await;
        };
        time::sleep_until(deadline).await;
        self.deadline = None;
    }
}
