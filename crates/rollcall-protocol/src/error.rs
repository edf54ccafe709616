//! Error types for the protocol layer.
//!
//! Each crate in Rollcall defines its own error enum. When you see a
//! `ProtocolError`, you know the problem is in what the client sent (or in
//! serializing a reply), not in networking or session state.
//!
//! The `Display` text of the parsing variants is exactly what the client
//! receives in an `ERROR` message, so keep it stable.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, a missing `event` field, or a
    /// `data` field that is not an object.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The envelope's `event` tag names no known event.
    ///
    /// The tag is kept for logging; clients only see the fixed text.
    #[error("unknown event type")]
    UnknownEvent(String),

    /// A required `data` field is missing, has the wrong type, or holds a
    /// value outside its allowed set. The field name is shown to the client.
    #[error("invalid {0}")]
    InvalidField(&'static str),

    /// A signaling event arrived without a usable `targetId`.
    #[error("missing targetId in WebRTC message")]
    MissingTarget,

    /// A value could not be parsed into a protocol type (e.g. an unknown
    /// role name coming from an identity provider).
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
