//! Protocol types for the RCON wire format and the roster it reports.
//!
//! Two kinds of things live here:
//!
//! - **Packet vocabulary** ([`PacketKind`], [`Opcode`]): the leading bytes
//!   that tell the remote server what a packet means.
//! - **Roster data** ([`PlayerRecord`], [`RosterSnapshot`]): what we
//!   extract from the server's free-form text reply.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Packet vocabulary
// ---------------------------------------------------------------------------

/// The first byte of every client packet.
///
/// `#[repr(u8)]` pins each variant to its wire value, so `kind as u8`
/// is exactly the byte we send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketKind {
    /// Authenticates the client: `0x01 ‖ password ‖ 0x00`.
    Login = 0x01,
    /// Runs a server command: `0x02 ‖ opcode ‖ 0x00`.
    Command = 0x02,
}

impl PacketKind {
    /// The wire byte for this packet kind.
    pub fn byte(self) -> u8 {
        self as u8
    }
}

/// Command opcodes understood by the remote server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Fetch the connected-player roster.
    GetPlayerData = 0x77,
}

impl Opcode {
    /// The wire byte for this opcode.
    pub fn byte(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GetPlayerData => write!(f, "GetPlayerData(0x{:02x})", self.byte()),
        }
    }
}

// ---------------------------------------------------------------------------
// Roster data
// ---------------------------------------------------------------------------

/// One connected player, as reported by the server.
///
/// Identity is the `id` field: two records with the same id are the same
/// player, even if the name differs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// The server's numeric player id, kept verbatim as text.
    pub id: String,
    /// Display name with surrounding quotes and whitespace stripped.
    pub name: String,
    /// The player's in-game class.
    pub class: String,
}

impl PlayerRecord {
    /// Convenience constructor.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        class: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            class: class.into(),
        }
    }
}

impl fmt::Display for PlayerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// The deduplicated, ordered list of players from one poll.
///
/// The only way to build a non-empty snapshot is [`RosterSnapshot::from_records`],
/// which drops any record whose id was already seen. That makes "no two
/// records share an id" a property of the type rather than of every caller.
///
/// An empty snapshot comes in two flavours that compare unequal:
/// - [`RosterSnapshot::no_players`]: the server *said* nobody is connected.
/// - [`RosterSnapshot::empty`]: we have nothing to report (stalled reply,
///   unrecognised payload).
///
/// Both mean "zero players" to a consumer; the distinction exists for logging.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RosterSnapshot {
    players: Vec<PlayerRecord>,
    #[serde(skip)]
    sentinel: bool,
}

impl RosterSnapshot {
    /// A snapshot with nothing to report.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The explicit "No Players Connected" answer.
    pub fn no_players() -> Self {
        Self {
            players: Vec::new(),
            sentinel: true,
        }
    }

    /// Builds a snapshot, keeping the first record for each id.
    pub fn from_records(records: impl IntoIterator<Item = PlayerRecord>) -> Self {
        let mut seen = HashSet::new();
        let players = records
            .into_iter()
            .filter(|p| seen.insert(p.id.clone()))
            .collect();
        Self {
            players,
            sentinel: false,
        }
    }

    /// Number of players.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// `true` when no players are listed.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// `true` if the server explicitly reported an empty server.
    pub fn is_sentinel_empty(&self) -> bool {
        self.sentinel
    }

    /// The players, in order of first appearance.
    pub fn players(&self) -> &[PlayerRecord] {
        &self.players
    }

    /// Iterates over the players.
    pub fn iter(&self) -> std::slice::Iter<'_, PlayerRecord> {
        self.players.iter()
    }

    /// Player display names, in roster order.
    pub fn names(&self) -> Vec<&str> {
        self.players.iter().map(|p| p.name.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a RosterSnapshot {
    type Item = &'a PlayerRecord;
    type IntoIter = std::slice::Iter<'a, PlayerRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.players.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
