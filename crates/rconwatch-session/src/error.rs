//! Error types for the session layer.
//!
//! These never leave the crate. A failed attempt is reported to callers as
//! a [`PollOutcome`](crate::PollOutcome) tag, and `SessionError` only exists
//! so the handshake code can use `?` on its way there.

use rconwatch_protocol::ProtocolError;
use rconwatch_transport::TransportError;

use crate::PollOutcome;

/// Why a poll attempt stopped short of a roster.
#[derive(Debug, thiserror::Error)]
pub(crate) enum SessionError {
    /// Socket-level failure (connect, send, receive).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The login packet could not be built.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The server never acknowledged the login before the deadline.
    #[error("login not accepted before the deadline")]
    LoginTimedOut,

    /// The server hung up before acknowledging the login. Wrong
    /// passwords usually end this way.
    #[error("connection closed before login was accepted")]
    ClosedDuringLogin,
}

impl SessionError {
    /// Maps the error to the outcome tag the rest of the system sees.
    pub(crate) fn into_outcome(self) -> PollOutcome {
        match self {
            Self::LoginTimedOut => PollOutcome::Timeout,
            other => PollOutcome::ConnectionFailure(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_timeout_maps_to_timeout() {
        assert_eq!(SessionError::LoginTimedOut.into_outcome(), PollOutcome::Timeout);
    }

    #[test]
    fn test_other_errors_map_to_connection_failure() {
        let outcome = SessionError::ClosedDuringLogin.into_outcome();
        assert_eq!(
            outcome,
            PollOutcome::ConnectionFailure(
                "connection closed before login was accepted".into()
            )
        );

        let outcome = SessionError::from(ProtocolError::InvalidPassword).into_outcome();
        assert!(matches!(outcome, PollOutcome::ConnectionFailure(ref r) if r.contains("NUL")));
    }
}
