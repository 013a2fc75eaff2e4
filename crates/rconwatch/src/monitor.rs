//! `StatusMonitor`: configuration in, running engine out.
//!
//! This ties the layers together: config → session → retry → engine.

use rconwatch_engine::{
    Clock, EngineError, EngineHandle, EngineStatus, Notifier, ServerState, SystemClock,
    spawn_engine,
};
use rconwatch_protocol::RconCodec;

use crate::{MonitorConfig, RconwatchError};

/// A running status monitor for one game server.
///
/// Dropping the monitor (and every clone of its handle) stops the engine.
#[derive(Debug, Clone)]
pub struct StatusMonitor {
    handle: EngineHandle,
}

impl StatusMonitor {
    /// Reads the environment and starts monitoring.
    ///
    /// Must be called from inside a Tokio runtime.
    pub fn from_env<N: Notifier>(notifier: N) -> Result<Self, RconwatchError> {
        let config = MonitorConfig::from_env()?;
        Ok(Self::start(config, notifier))
    }

    /// Starts monitoring with the local system clock.
    pub fn start<N: Notifier>(config: MonitorConfig, notifier: N) -> Self {
        Self::start_with_clock(config, notifier, SystemClock)
    }

    /// Starts monitoring with a specific wall clock.
    pub fn start_with_clock<N: Notifier, K: Clock>(
        config: MonitorConfig,
        notifier: N,
        clock: K,
    ) -> Self {
        let session = config.transport_session();
        tracing::info!(
            addr = %session.addr(),
            attempts = config.retry.max_attempts(),
            protocol_revision = RconCodec::REVISION,
            "starting status monitor"
        );
        let handle = spawn_engine(config.engine, session, config.retry, notifier, clock);
        Self { handle }
    }

    /// The underlying engine handle.
    pub fn handle(&self) -> &EngineHandle {
        &self.handle
    }

    /// Polls now. See [`EngineHandle::poll_now`].
    pub async fn poll_now(&self) -> Result<ServerState, EngineError> {
        self.handle.poll_now().await
    }

    /// Current state and last known roster.
    pub async fn status(&self) -> Result<EngineStatus, EngineError> {
        self.handle.status().await
    }

    /// Stops the engine and waits for it to finish.
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        self.handle.shutdown().await?;
        self.handle.stopped().await;
        Ok(())
    }
}
