//! Unified error type for rconwatch.

use rconwatch_engine::EngineError;

use crate::ConfigError;

/// Top-level error for the monitor's public API.
///
/// Socket and packet errors never reach this level: the session layer
/// folds them into a [`PollOutcome`](rconwatch_session::PollOutcome).
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RconwatchError {
    /// The status engine has stopped.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The environment configuration is missing or malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
