//! One poll attempt against the remote server.
//!
//! A [`TransportSession`] owns nothing long-lived. Each call to
//! [`TransportSession::attempt`] opens a fresh TCP connection, logs in,
//! asks for the roster, and closes the connection again:
//!
//! ```text
//! connect ──→ login ──→ settle ──→ command ──→ collect reply ──→ close
//!    │          │                     │             │
//!    ▼          ▼                     ▼             ▼
//! failure    timeout /             failure       roster (possibly
//!            failure                             empty on stall)
//! ```
//!
//! Two deadlines apply. The overall `attempt_timeout` bounds everything
//! from connect to the end of the reply. The shorter `response_timeout`
//! bounds only the wait for the roster reply; when it expires the attempt
//! ends with whatever roster the partial reply holds, usually none.

use std::fmt;
use std::time::Duration;

use rconwatch_protocol::{Opcode, RconCodec, RosterSnapshot, WireCodec};
use rconwatch_transport::{Connection, TcpConnection};
use tokio::time::{self, Instant};
use tracing::Instrument;

use crate::handshake;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Deadlines and delays for a single poll attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Overall deadline for connect + login + reply.
    ///
    /// Default: 20 seconds.
    pub attempt_timeout: Duration,

    /// How long to wait for the roster reply after sending the command.
    /// Always cut off at the overall deadline.
    ///
    /// Default: 5 seconds.
    pub response_timeout: Duration,

    /// Pause between login acceptance and the roster command.
    ///
    /// Default: 500 ms.
    pub settle_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(20),
            response_timeout: Duration::from_secs(5),
            settle_delay: Duration::from_millis(500),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// The result of one protocol exchange, as seen by everything above the
/// session layer. Raw socket errors never escape; they are folded into
/// one of these tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The server answered. The roster may be empty.
    Success(RosterSnapshot),
    /// Connect, send, or receive failed. Carries a human-readable reason.
    ConnectionFailure(String),
    /// The server did not respond before the deadline.
    Timeout,
}

impl PollOutcome {
    /// `true` for [`PollOutcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The roster, if the poll succeeded.
    pub fn roster(&self) -> Option<&RosterSnapshot> {
        match self {
            Self::Success(roster) => Some(roster),
            _ => None,
        }
    }
}

impl fmt::Display for PollOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(roster) => write!(f, "success ({} players)", roster.len()),
            Self::ConnectionFailure(reason) => write!(f, "connection failure: {reason}"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

/// What one attempt produced, plus how much the server said along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptReport {
    /// The outcome of the attempt.
    pub outcome: PollOutcome,
    /// Every byte read from the server during the attempt, login
    /// acknowledgement included.
    pub bytes_received: usize,
}

impl AttemptReport {
    /// Creates a report.
    pub fn new(outcome: PollOutcome, bytes_received: usize) -> Self {
        Self {
            outcome,
            bytes_received,
        }
    }

    /// A failure before the server sent a single byte.
    pub fn is_retryable(&self) -> bool {
        !self.outcome.is_success() && self.bytes_received == 0
    }
}

// ---------------------------------------------------------------------------
// TransportSession
// ---------------------------------------------------------------------------

/// Polls one remote server for its roster.
///
/// Cheap to keep around: it stores only the address, secret, deadlines and
/// codec. Connections are opened and closed inside [`attempt`](Self::attempt)
/// and never reused.
pub struct TransportSession<C: WireCodec = RconCodec> {
    addr: String,
    password: String,
    config: SessionConfig,
    codec: C,
}

impl TransportSession<RconCodec> {
    /// Creates a session for `host:port` using the standard codec.
    pub fn new(
        host: &str,
        port: u16,
        password: impl Into<String>,
        config: SessionConfig,
    ) -> Self {
        Self::with_codec(host, port, password, config, RconCodec)
    }
}

impl<C: WireCodec> TransportSession<C> {
    /// Creates a session with a specific codec.
    pub fn with_codec(
        host: &str,
        port: u16,
        password: impl Into<String>,
        config: SessionConfig,
        codec: C,
    ) -> Self {
        Self {
            addr: format!("{host}:{port}"),
            password: password.into(),
            config,
            codec,
        }
    }

    /// The `host:port` this session polls.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// The deadlines in use.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Runs one complete poll: connect, login, fetch roster, disconnect.
    pub async fn attempt(&self) -> AttemptReport {
        let deadline = Instant::now() + self.config.attempt_timeout;

        let conn = match time::timeout_at(deadline, TcpConnection::connect(&self.addr)).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => {
                tracing::debug!(addr = %self.addr, error = %e, "connect failed");
                return AttemptReport::new(PollOutcome::ConnectionFailure(e.to_string()), 0);
            }
            Err(_) => {
                tracing::debug!(addr = %self.addr, "connect timed out");
                return AttemptReport::new(PollOutcome::Timeout, 0);
            }
        };

        let span = tracing::debug_span!("rcon_attempt", conn = %conn.id(), addr = %self.addr);
        let report = self.exchange(&conn, deadline).instrument(span).await;

        if let Err(e) = conn.close().await {
            tracing::debug!(conn = %conn.id(), error = %e, "close failed");
        }
        report
    }

    /// Login + roster exchange over an already-open connection.
    pub(crate) async fn exchange<T: Connection>(
        &self,
        conn: &T,
        deadline: Instant,
    ) -> AttemptReport {
        let mut received = 0usize;

        if let Err(e) =
            handshake::login(conn, &self.codec, &self.password, deadline, &mut received).await
        {
            tracing::debug!(error = %e, bytes = received, "login failed");
            return AttemptReport::new(e.into_outcome(), received);
        }

        let settle_until = Instant::now() + self.config.settle_delay;
        if settle_until >= deadline {
            time::sleep_until(deadline).await;
            tracing::debug!(bytes = received, "attempt deadline reached while settling");
            return AttemptReport::new(PollOutcome::Timeout, received);
        }
        time::sleep_until(settle_until).await;

        let command = self.codec.encode_command(Opcode::GetPlayerData);
        if let Err(e) = conn.send(&command).await {
            tracing::debug!(error = %e, "roster command not sent");
            return AttemptReport::new(PollOutcome::ConnectionFailure(e.to_string()), received);
        }

        let response_deadline = (Instant::now() + self.config.response_timeout).min(deadline);
        let mut response = Vec::new();

        let outcome = loop {
            match time::timeout_at(response_deadline, conn.recv()).await {
                Ok(Ok(Some(chunk))) => {
                    received += chunk.len();
                    response.extend_from_slice(&chunk);
                    let text = String::from_utf8_lossy(&response);
                    if self.codec.is_response_complete(&text) {
                        tracing::trace!(response = %text, "roster reply");
                        break PollOutcome::Success(self.codec.parse_roster(&text));
                    }
                }
                Ok(Ok(None)) => break self.salvage(&response, "connection closed by server"),
                Ok(Err(e)) => break self.salvage(&response, &e.to_string()),
                Err(_) if response.is_empty() => {
                    tracing::warn!("server stalled after login; reporting empty roster");
                    break PollOutcome::Success(RosterSnapshot::empty());
                }
                Err(_) => {
                    tracing::warn!(
                        bytes = response.len(),
                        "roster reply incomplete at deadline; using partial data"
                    );
                    break PollOutcome::Success(
                        self.codec.parse_roster(&String::from_utf8_lossy(&response)),
                    );
                }
            }
        };

        if let PollOutcome::Success(roster) = &outcome {
            tracing::debug!(players = roster.len(), "roster received");
        }
        AttemptReport::new(outcome, received)
    }

    /// The reply ended early. Keep whatever it held, if anything.
    fn salvage(&self, response: &[u8], reason: &str) -> PollOutcome {
        if response.is_empty() {
            tracing::debug!(reason, "no roster reply before disconnect");
            return PollOutcome::ConnectionFailure(reason.to_string());
        }
        tracing::debug!(reason, bytes = response.len(), "parsing partial roster reply");
        PollOutcome::Success(self.codec.parse_roster(&String::from_utf8_lossy(response)))
    }
}

impl<C: WireCodec> fmt::Debug for TransportSession<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportSession")
            .field("addr", &self.addr)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use rconwatch_transport::{ConnectionId, TransportError};

    use super::*;

    /// One scripted reaction to a `recv` call.
    enum Step {
        Data(&'static str),
        Eof,
        Reset,
    }

    /// A connection that replays a script. Once the script runs out,
    /// `recv` pends forever, like a server that stopped talking.
    struct ScriptedConnection {
        steps: Mutex<VecDeque<Step>>,
        sent: Mutex<Vec<Vec<u8>>>,
        fail_send_after: Option<usize>,
    }

    impl ScriptedConnection {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps: Mutex::new(steps.into()),
                sent: Mutex::new(Vec::new()),
                fail_send_after: None,
            }
        }

        fn sent(&self) -> Vec<Vec<u8>> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Connection for ScriptedConnection {
        async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
            let mut sent = self.sent.lock().unwrap();
            if self.fail_send_after.is_some_and(|n| sent.len() >= n) {
                return Err(TransportError::SendFailed(std::io::ErrorKind::BrokenPipe.into()));
            }
            sent.push(data.to_vec());
            Ok(())
        }

        async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
            let step = self.steps.lock().unwrap().pop_front();
            match step {
                Some(Step::Data(text)) => Ok(Some(text.as_bytes().to_vec())),
                Some(Step::Eof) => Ok(None),
                Some(Step::Reset) => Err(TransportError::ReceiveFailed(
                    std::io::ErrorKind::ConnectionReset.into(),
                )),
                None => std::future::pending().await,
            }
        }

        async fn close(&self) -> Result<(), TransportError> {
            Ok(())
        }

        fn id(&self) -> ConnectionId {
            ConnectionId::new(0)
        }
    }

    fn session() -> TransportSession {
        TransportSession::new("127.0.0.1", 9000, "secret", SessionConfig::default())
    }

    async fn run(conn: &ScriptedConnection) -> AttemptReport {
        let s = session();
        let deadline = Instant::now() + s.config().attempt_timeout;
        s.exchange(conn, deadline).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_exchange_returns_roster() {
        let conn = ScriptedConnection::new(vec![
            Step::Data("Password Accepted"),
            Step::Data("Name: Ann, PlayerID: 1, Location: X=0, Class: Rex"),
        ]);
        let report = run(&conn).await;

        let roster = report.outcome.roster().expect("success");
        assert_eq!(roster.names(), vec!["Ann"]);
        assert!(report.bytes_received > 0);
        assert_eq!(
            conn.sent(),
            vec![b"\x01secret\x00".to_vec(), vec![0x02, 0x77, 0x00]]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_ack_split_across_reads() {
        let conn = ScriptedConnection::new(vec![
            Step::Data("Acc"),
            Step::Data("epted"),
            Step::Data("No Players Connected"),
        ]);
        let report = run(&conn).await;
        assert!(report.outcome.roster().expect("success").is_sentinel_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_delay_precedes_command() {
        let conn = ScriptedConnection::new(vec![
            Step::Data("Accepted"),
            Step::Data("No Players Connected"),
        ]);
        let start = Instant::now();
        run(&conn).await;
        assert!(start.elapsed() >= SessionConfig::default().settle_delay);
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_never_accepted_times_out() {
        let conn = ScriptedConnection::new(vec![]);
        let report = run(&conn).await;
        assert_eq!(report, AttemptReport::new(PollOutcome::Timeout, 0));
        assert!(report.is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_login_then_close_is_not_retryable() {
        let conn = ScriptedConnection::new(vec![Step::Data("Password Rejected"), Step::Eof]);
        let report = run(&conn).await;
        assert!(matches!(report.outcome, PollOutcome::ConnectionFailure(_)));
        assert_eq!(report.bytes_received, "Password Rejected".len());
        assert!(!report.is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stall_after_login_is_empty_success() {
        let conn = ScriptedConnection::new(vec![Step::Data("Accepted")]);
        let start = Instant::now();
        let report = run(&conn).await;

        assert_eq!(report.outcome, PollOutcome::Success(RosterSnapshot::empty()));
        let cfg = SessionConfig::default();
        // Secondary deadline, not the overall one.
        assert!(start.elapsed() < cfg.attempt_timeout);
        assert!(start.elapsed() >= cfg.settle_delay + cfg.response_timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_before_any_reply_is_connection_failure() {
        let conn = ScriptedConnection::new(vec![Step::Data("Accepted"), Step::Reset]);
        let report = run(&conn).await;
        assert!(matches!(report.outcome, PollOutcome::ConnectionFailure(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_after_partial_reply_keeps_partial() {
        let conn = ScriptedConnection::new(vec![
            Step::Data("Accepted"),
            Step::Data("Loading players..."),
            Step::Reset,
        ]);
        let report = run(&conn).await;
        assert_eq!(report.outcome, PollOutcome::Success(RosterSnapshot::empty()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_command_send_is_connection_failure() {
        let mut conn = ScriptedConnection::new(vec![Step::Data("Accepted")]);
        conn.fail_send_after = Some(1);
        let report = run(&conn).await;
        assert!(matches!(report.outcome, PollOutcome::ConnectionFailure(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_deadline_capped_by_overall_deadline() {
        let s = TransportSession::new(
            "127.0.0.1",
            9000,
            "secret",
            SessionConfig {
                attempt_timeout: Duration::from_secs(2),
                response_timeout: Duration::from_secs(60),
                settle_delay: Duration::from_millis(500),
            },
        );
        let conn = ScriptedConnection::new(vec![Step::Data("Accepted")]);
        let start = Instant::now();
        let report = s.exchange(&conn, start + s.config().attempt_timeout).await;

        assert!(report.outcome.is_success());
        assert!(start.elapsed() <= Duration::from_secs(2) + Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_delay_capped_by_overall_deadline() {
        let s = TransportSession::new(
            "127.0.0.1",
            9000,
            "secret",
            SessionConfig {
                attempt_timeout: Duration::from_secs(1),
                response_timeout: Duration::from_millis(500),
                settle_delay: Duration::from_secs(10),
            },
        );
        let conn = ScriptedConnection::new(vec![Step::Data("Accepted")]);
        let start = Instant::now();
        let report = s.exchange(&conn, start + s.config().attempt_timeout).await;

        assert_eq!(report.outcome, PollOutcome::Timeout);
        assert_eq!(report.bytes_received, "Accepted".len());
        assert!(start.elapsed() <= Duration::from_secs(1) + Duration::from_millis(1));
        // Only the login went out; the roster command was never sent.
        assert_eq!(conn.sent().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_nul_password_never_reaches_the_wire() {
        let s = TransportSession::new("127.0.0.1", 9000, "a\0b", SessionConfig::default());
        let conn = ScriptedConnection::new(vec![]);
        let report = s.exchange(&conn, Instant::now() + Duration::from_secs(1)).await;

        assert!(matches!(report.outcome, PollOutcome::ConnectionFailure(_)));
        assert!(conn.sent().is_empty());
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(PollOutcome::Timeout.to_string(), "timeout");
        assert_eq!(
            PollOutcome::Success(RosterSnapshot::empty()).to_string(),
            "success (0 players)"
        );
    }

    #[test]
    fn test_session_addr_and_debug_hide_password() {
        let s = session();
        assert_eq!(s.addr(), "127.0.0.1:9000");
        assert!(!format!("{s:?}").contains("secret"));
    }
}
