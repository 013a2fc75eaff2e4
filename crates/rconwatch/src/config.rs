//! Environment configuration.
//!
//! Every knob is an environment variable. Only the server address and
//! password are required; everything else falls back to a default.
//! Parsing goes through [`MonitorConfig::from_lookup`], so tests can feed
//! a map instead of touching the process environment.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rconwatch_engine::{EngineConfig, RestartWindow};
use rconwatch_session::{RetryPolicy, SessionConfig, TransportSession};

pub const RCON_IP: &str = "RCON_IP";
pub const RCON_PORT: &str = "RCON_PORT";
pub const RCON_PASSWORD: &str = "RCON_PASSWORD";
pub const POLL_INTERVAL_SECS: &str = "RCONWATCH_POLL_INTERVAL_SECS";
pub const RESTART_TIME: &str = "RCONWATCH_RESTART_TIME";
pub const RESTART_SETTLE_SECS: &str = "RCONWATCH_RESTART_SETTLE_SECS";
pub const RECHECK_INTERVAL_SECS: &str = "RCONWATCH_RECHECK_INTERVAL_SECS";
pub const ATTEMPT_TIMEOUT_MS: &str = "RCONWATCH_ATTEMPT_TIMEOUT_MS";
pub const RESPONSE_TIMEOUT_MS: &str = "RCONWATCH_RESPONSE_TIMEOUT_MS";
pub const SETTLE_DELAY_MS: &str = "RCONWATCH_SETTLE_DELAY_MS";
pub const RETRY_ATTEMPTS: &str = "RCONWATCH_RETRY_ATTEMPTS";
pub const RETRY_BACKOFF_MS: &str = "RCONWATCH_RETRY_BACKOFF_MS";

/// Configuration errors. Fatal: the monitor never starts with one.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything needed to run a status monitor.
#[derive(Clone)]
pub struct MonitorConfig {
    pub host: String,
    pub port: u16,
    pub password: String,
    pub session: SessionConfig,
    pub retry: RetryPolicy,
    pub engine: EngineConfig,
}

impl MonitorConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = get(RCON_IP).ok_or(ConfigError::Missing(RCON_IP))?;
        let port = parse_required::<u16>(RCON_PORT, get(RCON_PORT))?;
        if port == 0 {
            return Err(invalid(RCON_PORT, "0", "port must be non-zero"));
        }

        // Passwords are taken verbatim, surrounding whitespace included.
        let password = lookup(RCON_PASSWORD)
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing(RCON_PASSWORD))?;
        if password.contains('\0') {
            return Err(invalid(RCON_PASSWORD, "<redacted>", "contains a NUL byte"));
        }

        let session = SessionConfig {
            attempt_timeout: millis(ATTEMPT_TIMEOUT_MS, get(ATTEMPT_TIMEOUT_MS), 20_000)?,
            response_timeout: millis(RESPONSE_TIMEOUT_MS, get(RESPONSE_TIMEOUT_MS), 5_000)?,
            settle_delay: millis(SETTLE_DELAY_MS, get(SETTLE_DELAY_MS), 500)?,
        };
        validate_session(&session)?;

        let attempts = parse_or::<u32>(RETRY_ATTEMPTS, get(RETRY_ATTEMPTS), 3)?;
        if attempts == 0 {
            return Err(invalid(RETRY_ATTEMPTS, "0", "at least one attempt is required"));
        }
        let retry = RetryPolicy::new(attempts, millis(RETRY_BACKOFF_MS, get(RETRY_BACKOFF_MS), 5_000)?);

        let recheck_interval = secs(RECHECK_INTERVAL_SECS, get(RECHECK_INTERVAL_SECS), 30)?;
        if recheck_interval.is_zero() {
            return Err(invalid(RECHECK_INTERVAL_SECS, "0", "interval must be non-zero"));
        }

        let engine = EngineConfig {
            poll_interval: secs(POLL_INTERVAL_SECS, get(POLL_INTERVAL_SECS), 180)?,
            restart_window: restart_window(get(RESTART_TIME))?,
            restart_settle: secs(RESTART_SETTLE_SECS, get(RESTART_SETTLE_SECS), 60)?,
            recheck_interval,
            ..EngineConfig::default()
        };

        Ok(Self {
            host,
            port,
            password,
            session,
            retry,
            engine,
        })
    }

    /// The session that polls the configured server.
    pub fn transport_session(&self) -> TransportSession {
        TransportSession::new(&self.host, self.port, self.password.clone(), self.session.clone())
    }
}

impl fmt::Debug for MonitorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &"<redacted>")
            .field("session", &self.session)
            .field("retry", &self.retry)
            .field("engine", &self.engine)
            .finish()
    }
}

/// The response deadline and the settle delay both run inside the attempt
/// deadline, so each must be strictly shorter than it.
fn validate_session(session: &SessionConfig) -> Result<(), ConfigError> {
    let ms = |d: Duration| d.as_millis().to_string();

    if session.attempt_timeout.is_zero() {
        return Err(invalid(ATTEMPT_TIMEOUT_MS, "0", "timeout must be non-zero"));
    }
    if session.response_timeout.is_zero() {
        return Err(invalid(RESPONSE_TIMEOUT_MS, "0", "timeout must be non-zero"));
    }
    if session.response_timeout >= session.attempt_timeout {
        return Err(invalid(
            RESPONSE_TIMEOUT_MS,
            &ms(session.response_timeout),
            format!("must be shorter than {ATTEMPT_TIMEOUT_MS}"),
        ));
    }
    if session.settle_delay >= session.attempt_timeout {
        return Err(invalid(
            SETTLE_DELAY_MS,
            &ms(session.settle_delay),
            format!("must be shorter than {ATTEMPT_TIMEOUT_MS}"),
        ));
    }
    Ok(())
}

fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_required<T>(key: &'static str, raw: Option<String>) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = raw.ok_or(ConfigError::Missing(key))?;
    raw.parse().map_err(|e: T::Err| invalid(key, &raw, e.to_string()))
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match raw {
        Some(raw) => raw.parse().map_err(|e: T::Err| invalid(key, &raw, e.to_string())),
        None => Ok(default),
    }
}

fn secs(key: &'static str, raw: Option<String>, default: u64) -> Result<Duration, ConfigError> {
    parse_or(key, raw, default).map(Duration::from_secs)
}

fn millis(key: &'static str, raw: Option<String>, default: u64) -> Result<Duration, ConfigError> {
    parse_or(key, raw, default).map(Duration::from_millis)
}

/// `HH:MM`, or `off` to disable. Unset means the default `07:59`.
fn restart_window(raw: Option<String>) -> Result<Option<RestartWindow>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(EngineConfig::default().restart_window);
    };
    if raw.eq_ignore_ascii_case("off") {
        return Ok(None);
    }
    parse_window(&raw)
        .map(Some)
        .ok_or_else(|| invalid(RESTART_TIME, &raw, "expected HH:MM or \"off\""))
}

fn parse_window(raw: &str) -> Option<RestartWindow> {
    let (hour, minute) = raw.split_once(':')?;
    RestartWindow::new(hour.parse().ok()?, minute.parse().ok()?)
}
