//! RCON poll attempts for rconwatch.
//!
//! This crate turns "is the server up, and who is on it?" into a single
//! tagged answer, [`PollOutcome`]:
//!
//! 1. **Attempt** — [`TransportSession`] opens one TCP connection, logs in,
//!    requests the roster and closes the connection, all under deadlines
//!    from [`SessionConfig`].
//! 2. **Retry** — [`RetryPolicy`] repeats attempts that failed before the
//!    server said anything, with a fixed backoff in between.
//!
//! # How it fits in the stack
//!
//! ```text
//! Engine (above)   ← schedules polls, interprets PollOutcome
//!     ↕
//! Session (this crate)  ← one attempt, bounded retries
//!     ↕
//! Protocol + Transport (below)  ← packet bytes, TCP socket
//! ```
//!
//! Socket errors stop here. Nothing above this crate sees a
//! `TransportError`, only the outcome tag.

mod error;
mod handshake;
mod retry;
mod session;

pub use retry::{Probe, RetryPolicy};
pub use session::{AttemptReport, PollOutcome, SessionConfig, TransportSession};
