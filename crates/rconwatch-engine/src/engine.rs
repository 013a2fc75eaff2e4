//! Status engine actor: an isolated Tokio task that owns the server state.
//!
//! The outside world talks to it through an mpsc channel wrapped in an
//! [`EngineHandle`]. Inside, one `select!` loop drives every timer and the
//! single in-flight poll, so state transitions never race each other.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use rconwatch_protocol::RosterSnapshot;
use rconwatch_session::{PollOutcome, Probe, RetryPolicy};
use rconwatch_tick::{OneShotTimer, PollTimer, PollTimerConfig};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

use crate::{Clock, EngineConfig, EngineError, Notifier, ServerState, StatusUpdate};

/// Longest the window timer sleeps before reading the wall clock again.
const WINDOW_CLOCK_RECHECK: Duration = Duration::from_secs(60);

/// Commands sent to the engine actor through its channel.
pub(crate) enum EngineCommand {
    /// Poll now and reply with the resulting state.
    PollNow {
        reply: oneshot::Sender<ServerState>,
    },

    /// Request a status snapshot.
    Status {
        reply: oneshot::Sender<EngineStatus>,
    },

    /// Stop the engine.
    Shutdown,
}

/// A snapshot of what the engine knows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStatus {
    /// Current server state.
    pub state: ServerState,
    /// Roster from the most recent successful poll, if any.
    pub last_roster: Option<RosterSnapshot>,
    /// Whether a poll is running right now.
    pub poll_in_flight: bool,
    /// Polls started since the engine came up, re-checks included.
    pub polls_started: u64,
}

/// Handle to a running engine. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    sender: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    /// Polls the server now and returns the resulting state.
    ///
    /// If a poll is already running, waits for that one instead of
    /// starting another. While the server is restarting, returns
    /// [`ServerState::Restarting`] without polling.
    pub async fn poll_now(&self) -> Result<ServerState, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(EngineCommand::PollNow { reply: reply_tx })
            .await
            .map_err(|_| EngineError::Unavailable)?;
        reply_rx.await.map_err(|_| EngineError::Unavailable)
    }

    /// Requests a status snapshot.
    pub async fn status(&self) -> Result<EngineStatus, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(EngineCommand::Status { reply: reply_tx })
            .await
            .map_err(|_| EngineError::Unavailable)?;
        reply_rx.await.map_err(|_| EngineError::Unavailable)
    }

    /// Tells the engine to stop. Any in-flight poll is dropped.
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        self.sender
            .send(EngineCommand::Shutdown)
            .await
            .map_err(|_| EngineError::Unavailable)
    }

    /// Resolves once the engine task has stopped.
    pub async fn stopped(&self) {
        self.sender.closed().await
    }

    /// Whether the engine task has stopped.
    pub fn is_stopped(&self) -> bool {
        self.sender.is_closed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollKind {
    Scheduled,
    Manual,
    Recheck,
}

/// The one poll allowed to run at a time.
struct InFlight {
    kind: PollKind,
    future: BoxFuture<'static, PollOutcome>,
    /// Manual callers waiting on this poll's result.
    waiters: Vec<oneshot::Sender<ServerState>>,
}

/// The internal engine state. Runs inside a Tokio task.
struct EngineActor<P, N, K> {
    config: EngineConfig,
    state: ServerState,
    last_roster: Option<RosterSnapshot>,
    probe: Arc<P>,
    retry: RetryPolicy,
    notifier: N,
    clock: K,
    ticker: PollTimer,
    recheck: OneShotTimer,
    window_timer: OneShotTimer,
    in_flight: Option<InFlight>,
    /// The window came due while a poll was running.
    restart_pending: bool,
    polls_started: u64,
    receiver: mpsc::Receiver<EngineCommand>,
}

impl<P: Probe, N: Notifier, K: Clock> EngineActor<P, N, K> {
    /// Runs the actor loop until shutdown or until every handle is gone.
    async fn run(mut self) {
        info!(
            interval_secs = self.config.poll_interval.as_secs(),
            restart_window = ?self.config.restart_window.map(|w| w.to_string()),
            "status engine started"
        );

        let now = self.clock.now();
        self.arm_window(now);
        if self.config.poll_on_start {
            self.on_tick();
        }

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(EngineCommand::Shutdown) | None => break,
                    Some(cmd) => self.handle_command(cmd),
                },
                outcome = next_outcome(&mut self.in_flight) => {
                    self.finish_poll(outcome);
                }
                _ = self.ticker.wait_for_tick(), if self.in_flight.is_none() => {
                    self.on_tick();
                }
                _ = self.recheck.wait(), if self.in_flight.is_none() => {
                    self.start_poll(PollKind::Recheck, Vec::new());
                }
                _ = self.window_timer.wait() => {
                    self.on_window();
                }
            }
        }

        if let Some(in_flight) = self.in_flight.take() {
            debug!(kind = ?in_flight.kind, "dropping in-flight poll");
        }
        info!(state = %self.state, "status engine stopped");
    }

    fn handle_command(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::PollNow { reply } => self.handle_poll_now(reply),
            EngineCommand::Status { reply } => {
                let _ = reply.send(self.status());
            }
            EngineCommand::Shutdown => {}
        }
    }

    fn handle_poll_now(&mut self, reply: oneshot::Sender<ServerState>) {
        if self.state.is_restarting() {
            debug!("manual poll during restart window; not polling");
            let _ = reply.send(ServerState::Restarting);
            return;
        }
        if let Some(in_flight) = self.in_flight.as_mut() {
            debug!(kind = ?in_flight.kind, "manual poll joined in-flight poll");
            in_flight.waiters.push(reply);
            return;
        }
        self.start_poll(PollKind::Manual, vec![reply]);
    }

    /// A scheduled tick either enters the restart window or polls.
    fn on_tick(&mut self) {
        if self.window_due() {
            self.enter_restarting();
        } else {
            self.start_poll(PollKind::Scheduled, Vec::new());
        }
    }

    /// The window timer runs on tokio time, not the wall clock, so the
    /// minute is checked here exactly like a scheduled tick checks it.
    fn on_window(&mut self) {
        let now = self.clock.now();
        self.arm_window(now);

        if !self.window_due() {
            trace!(%now, "window timer woke outside the restart window");
            return;
        }
        if self.in_flight.is_some() {
            debug!("restart window reached during a poll; deferring");
            self.restart_pending = true;
            return;
        }
        self.enter_restarting();
    }

    fn window_due(&self) -> bool {
        !self.state.is_restarting()
            && self
                .config
                .restart_window
                .is_some_and(|w| w.matches(self.clock.now()))
    }

    /// Arms the window timer for the first window start after `now`.
    ///
    /// Sleeps at most [`WINDOW_CLOCK_RECHECK`] at a time, so a jump in local
    /// time (DST, NTP step, suspend) moves the wake-up with it.
    fn arm_window(&mut self, now: NaiveDateTime) {
        let Some(window) = self.config.restart_window else {
            return;
        };
        let target = window.next_after(now);
        let delay = (target - now)
            .to_std()
            .unwrap_or_default()
            .min(WINDOW_CLOCK_RECHECK);
        self.window_timer.arm(delay);
        trace!(%target, delay_secs = delay.as_secs(), "restart window timer armed");
    }

    fn start_poll(&mut self, kind: PollKind, waiters: Vec<oneshot::Sender<ServerState>>) {
        let probe = Arc::clone(&self.probe);
        let future = match kind {
            PollKind::Recheck => async move { probe.attempt().await.outcome }.boxed(),
            PollKind::Scheduled | PollKind::Manual => {
                let retry = self.retry;
                async move { retry.poll_with_retry(&*probe).await }.boxed()
            }
        };

        self.polls_started += 1;
        debug!(?kind, poll = self.polls_started, "poll started");
        self.in_flight = Some(InFlight {
            kind,
            future,
            waiters,
        });
    }

    fn finish_poll(&mut self, outcome: PollOutcome) {
        let Some(in_flight) = self.in_flight.take() else {
            return;
        };

        if in_flight.kind == PollKind::Recheck {
            self.finish_recheck(outcome);
        } else if std::mem::take(&mut self.restart_pending) {
            debug!(%outcome, "discarding poll result for restart window");
            self.enter_restarting();
        } else {
            self.apply_outcome(outcome);
        }

        for waiter in in_flight.waiters {
            let _ = waiter.send(self.state);
        }
    }

    fn apply_outcome(&mut self, outcome: PollOutcome) {
        match outcome {
            PollOutcome::Success(roster) => self.go_online(roster),
            failure => {
                warn!(outcome = %failure, "server unreachable");
                self.set_state(ServerState::Offline);
                self.publish(None);
            }
        }
    }

    fn finish_recheck(&mut self, outcome: PollOutcome) {
        match outcome {
            PollOutcome::Success(roster) => {
                self.recheck.cancel();
                self.ticker.resume();
                self.go_online(roster);
            }
            failure => {
                debug!(
                    outcome = %failure,
                    retry_secs = self.config.recheck_interval.as_secs(),
                    "server still restarting"
                );
                self.recheck.arm(self.config.recheck_interval);
            }
        }
    }

    fn enter_restarting(&mut self) {
        self.restart_pending = false;
        self.set_state(ServerState::Restarting);
        self.ticker.pause();
        self.recheck.arm(self.config.restart_settle);
        self.publish(None);
    }

    fn go_online(&mut self, roster: RosterSnapshot) {
        info!(players = roster.len(), "roster updated");
        self.set_state(ServerState::Online);
        self.last_roster = Some(roster.clone());
        self.publish(Some(roster));
    }

    fn set_state(&mut self, next: ServerState) {
        if self.state != next {
            info!(from = %self.state, to = %next, "server state changed");
            self.state = next;
        }
    }

    fn publish(&self, roster: Option<RosterSnapshot>) {
        self.notifier.publish(StatusUpdate {
            state: self.state,
            roster,
            at: self.clock.now(),
        });
    }

    fn status(&self) -> EngineStatus {
        EngineStatus {
            state: self.state,
            last_roster: self.last_roster.clone(),
            poll_in_flight: self.in_flight.is_some(),
            polls_started: self.polls_started,
        }
    }
}

/// Resolves with the in-flight poll's outcome, or pends if there is none.
///
/// Cancel-safe: the boxed poll stays in `in_flight` when this is dropped.
async fn next_outcome(in_flight: &mut Option<InFlight>) -> PollOutcome {
    match in_flight {
        Some(in_flight) => in_flight.future.as_mut().await,
        None => std::future::pending().await,
    }
}

/// Spawns a status engine task and returns a handle to it.
///
/// The engine starts `Offline`. With `poll_on_start` it polls at once;
/// otherwise the first scheduled poll is one interval away.
pub fn spawn_engine<P, N, K>(
    config: EngineConfig,
    probe: P,
    retry: RetryPolicy,
    notifier: N,
    clock: K,
) -> EngineHandle
where
    P: Probe,
    N: Notifier,
    K: Clock,
{
    let (tx, rx) = mpsc::channel(config.command_buffer.max(1));

    let ticker = PollTimer::new(PollTimerConfig {
        interval: config.poll_interval,
        policy: config.missed_tick_policy,
    });

    let actor = EngineActor {
        config,
        state: ServerState::Offline,
        last_roster: None,
        probe: Arc::new(probe),
        retry,
        notifier,
        clock,
        ticker,
        recheck: OneShotTimer::new(),
        window_timer: OneShotTimer::new(),
        in_flight: None,
        restart_pending: false,
        polls_started: 0,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    EngineHandle { sender: tx }
}
