//! Bounded retry with a fixed backoff.

use std::sync::Arc;
use std::time::Duration;

use rconwatch_protocol::WireCodec;
use tokio::time;

use crate::{AttemptReport, PollOutcome, TransportSession};

/// Something that can run one poll attempt.
///
/// [`TransportSession`] is the real implementation. The seam exists so the
/// retry loop and the status engine can be driven by test doubles.
pub trait Probe: Send + Sync + 'static {
    /// Runs one attempt and reports what happened.
    fn attempt(&self) -> impl Future<Output = AttemptReport> + Send;
}

impl<C: WireCodec> Probe for TransportSession<C> {
    fn attempt(&self) -> impl Future<Output = AttemptReport> + Send {
        TransportSession::attempt(self)
    }
}

impl<P: Probe> Probe for Arc<P> {
    fn attempt(&self) -> impl Future<Output = AttemptReport> + Send {
        (**self).attempt()
    }
}

/// How many times to try, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy. `max_attempts` is clamped to at least 1.
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// A policy that tries exactly once.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Total attempts per poll, the first one included. Never zero.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Fixed pause between a failed attempt and the next one.
    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Polls until success, a non-retryable failure, or the attempt budget
    /// runs out.
    ///
    /// Only failures where the server sent nothing at all are retried. The
    /// last failure is returned unchanged; deciding what it means is the
    /// caller's job.
    pub async fn poll_with_retry<P: Probe>(&self, probe: &P) -> PollOutcome {
        let mut attempt = 1;
        loop {
            let report = probe.attempt().await;
            if !report.is_retryable() {
                if !report.outcome.is_success() {
                    tracing::debug!(
                        attempt,
                        bytes = report.bytes_received,
                        outcome = %report.outcome,
                        "server answered but poll failed; not retrying"
                    );
                }
                return report.outcome;
            }
            if attempt >= self.max_attempts {
                tracing::warn!(
                    attempts = attempt,
                    outcome = %report.outcome,
                    "poll failed on every attempt"
                );
                return report.outcome;
            }
            tracing::debug!(
                attempt,
                max = self.max_attempts,
                outcome = %report.outcome,
                backoff_ms = self.backoff.as_millis() as u64,
                "poll attempt failed; backing off"
            );
            time::sleep(self.backoff).await;
            attempt += 1;
        }
    }
}
