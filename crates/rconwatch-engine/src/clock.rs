//! Wall-clock seam.
//!
//! The restart window is a local wall-clock minute, so the engine asks a
//! [`Clock`] for the time instead of calling `chrono::Local` directly.
//! Tests supply a clock that advances with tokio's paused time.

use chrono::{Local, NaiveDateTime};

/// Source of local wall-clock time.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> NaiveDateTime;
}

/// The host's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}
