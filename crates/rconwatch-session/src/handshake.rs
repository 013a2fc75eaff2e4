//! The login handshake.
//!
//! Before the server will answer any command, the client has to prove it
//! knows the shared secret:
//!
//! ```text
//! client ── 0x01 ‖ password ‖ 0x00 ──→ server
//! client ←──── "...Accepted..." ─────── server
//! ```
//!
//! The acknowledgement is plain text and may arrive split across several
//! TCP reads, so we keep accumulating until the codec recognises it or the
//! attempt's deadline passes.

use rconwatch_protocol::WireCodec;
use rconwatch_transport::Connection;
use tokio::time::{self, Instant};

use crate::error::SessionError;

/// Sends the login packet and waits for the acknowledgement.
///
/// `received` is bumped by every byte read, including the bytes of a
/// failed login. The retry policy relies on that count.
pub(crate) async fn login<T, C>(
    conn: &T,
    codec: &C,
    password: &str,
    deadline: Instant,
    received: &mut usize,
) -> Result<(), SessionError>
where
    T: Connection,
    C: WireCodec,
{
    let packet = codec.encode_login(password)?;
    conn.send(&packet).await?;

    let mut reply = Vec::new();
    loop {
        let chunk = match time::timeout_at(deadline, conn.recv()).await {
            Ok(result) => result?,
            Err(_) => return Err(SessionError::LoginTimedOut),
        };
        let Some(chunk) = chunk else {
            return Err(SessionError::ClosedDuringLogin);
        };

        *received += chunk.len();
        reply.extend_from_slice(&chunk);

        if codec.is_login_accepted(&String::from_utf8_lossy(&reply)) {
            tracing::debug!(conn = %conn.id(), "login accepted");
            return Ok(());
        }
    }
}
