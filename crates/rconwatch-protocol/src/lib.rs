//! Wire protocol for rconwatch.
//!
//! This crate defines the "language" spoken with the remote game server:
//!
//! - **Types** ([`PacketKind`], [`Opcode`], [`PlayerRecord`],
//!   [`RosterSnapshot`]) — packet vocabulary and the roster data model.
//! - **Codec** ([`WireCodec`] trait, [`RconCodec`]) — how requests become
//!   bytes and how reply text becomes a roster.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while encoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and session
//! (one login + command exchange). It never touches a socket.
//!
//! ```text
//! Transport (bytes) → Protocol (markers, roster) → Session (poll attempt)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{
    LOGIN_ACCEPTED, NO_PLAYERS_SENTINEL, RECORD_MARKERS, RconCodec, WireCodec,
};
pub use error::ProtocolError;
pub use types::{Opcode, PacketKind, PlayerRecord, RosterSnapshot};
