//! Error types for the protocol layer.
//!
//! Note what is *not* here: a roster that fails to parse is not an error.
//! The codec degrades it to an empty roster, because a cosmetic parse miss
//! must never flip the server to Offline.

/// Errors that can occur while building RCON packets.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The login packet is NUL-terminated, so the password itself
    /// cannot contain a NUL byte.
    #[error("password must not contain a NUL byte")]
    InvalidPassword,
}
