//! The wire codec: packet encoding and response interpretation.
//!
//! The remote server speaks a hybrid protocol. Requests are tiny binary
//! packets, replies are free-form text with no length framing. So the codec
//! has two jobs:
//!
//! 1. **Encode** the two request packets (login, command).
//! 2. **Interpret** accumulated reply text: has the login been accepted,
//!    has the roster reply arrived, and which players does it list.
//!
//! Everything here is pure. The session layer owns the socket and asks
//! the codec questions about the bytes it has collected so far.
//!
//! [`WireCodec`] is the seam: the state machine above never sees the text
//! markers, so a framed or binary variant of the protocol can be swapped in
//! by providing another implementation.

use std::sync::LazyLock;

use regex::Regex;

use crate::{Opcode, PacketKind, PlayerRecord, ProtocolError, RosterSnapshot};

/// Reply text that confirms a successful login.
pub const LOGIN_ACCEPTED: &str = "Accepted";

/// Reply text for an empty server.
pub const NO_PLAYERS_SENTINEL: &str = "No Players Connected";

/// Markers that show a player record has started to arrive.
pub const RECORD_MARKERS: [&str; 2] = ["PlayerDataName", "Name:"];

// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static RECORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:PlayerDataName|Name):\s*([^,]+),\s*PlayerID:\s*(\d+),\s*Location:[^,]+,\s*Class:\s*([^,\s]+)",
    )
    .expect("constant regex pattern is valid")
});

/// Encodes requests and interprets replies for one protocol revision.
///
/// `Send + Sync + 'static` because a codec lives inside the transport
/// session, which is shared with the engine's poll task.
pub trait WireCodec: Send + Sync + 'static {
    /// Builds the login packet for `password`.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidPassword`] if the password cannot be
    /// represented on the wire.
    fn encode_login(&self, password: &str) -> Result<Vec<u8>, ProtocolError>;

    /// Builds a command packet for `opcode`.
    fn encode_command(&self, opcode: Opcode) -> Vec<u8>;

    /// Whether the accumulated login reply confirms authentication.
    fn is_login_accepted(&self, text: &str) -> bool;

    /// Whether the accumulated command reply is complete enough to parse.
    fn is_response_complete(&self, text: &str) -> bool;

    /// Extracts the roster from reply text. Never fails: text that holds
    /// no recognisable record yields an empty roster.
    fn parse_roster(&self, text: &str) -> RosterSnapshot;
}

/// The text-marker codec spoken by current game servers.
#[derive(Debug, Clone, Copy, Default)]
pub struct RconCodec;

impl RconCodec {
    /// Protocol revision implemented by this codec.
    pub const REVISION: u32 = 1;
}

impl WireCodec for RconCodec {
    fn encode_login(&self, password: &str) -> Result<Vec<u8>, ProtocolError> {
        if password.as_bytes().contains(&0) {
            return Err(ProtocolError::InvalidPassword);
        }
        let mut packet = Vec::with_capacity(password.len() + 2);
        packet.push(PacketKind::Login.byte());
        packet.extend_from_slice(password.as_bytes());
        packet.push(0x00);
        Ok(packet)
    }

    fn encode_command(&self, opcode: Opcode) -> Vec<u8> {
        vec![PacketKind::Command.byte(), opcode.byte(), 0x00]
    }

    fn is_login_accepted(&self, text: &str) -> bool {
        text.contains(LOGIN_ACCEPTED)
    }

    fn is_response_complete(&self, text: &str) -> bool {
        text.contains(NO_PLAYERS_SENTINEL)
            || RECORD_MARKERS.iter().any(|m| text.contains(m))
    }

    fn parse_roster(&self, text: &str) -> RosterSnapshot {
        if text.contains(NO_PLAYERS_SENTINEL) {
            return RosterSnapshot::no_players();
        }

        let records = RECORD_PATTERN.captures_iter(text).filter_map(|caps| {
            let name = clean_name(caps.get(1)?.as_str());
            let id = caps.get(2)?.as_str().trim();
            let class = caps.get(3)?.as_str();
            if name.is_empty() || id.is_empty() {
                return None;
            }
            Some(PlayerRecord::new(id, name, class))
        });

        RosterSnapshot::from_records(records)
    }
}

/// Strips surrounding quote characters and whitespace.
fn clean_name(raw: &str) -> &str {
    raw.trim_matches(|c: char| c == '"' || c == '\'' || c.is_whitespace())
}
