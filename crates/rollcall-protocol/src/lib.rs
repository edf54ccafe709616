//! Wire protocol for Rollcall.
//!
//! This crate defines the "language" that classroom clients and the hub
//! speak:
//!
//! - **Identity types** ([`UserId`], [`ClassId`], [`Role`], [`Identity`],
//!   [`AttendanceStatus`]): who is talking and what can be recorded.
//! - **Inbound events** ([`Envelope`], [`EventKind`], [`Marking`],
//!   [`Signal`]): what clients send, parsed once at the boundary.
//! - **Outbound messages** ([`ServerMessage`]): the closed set of things
//!   the hub ever writes to a socket.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong while parsing.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the hub
//! (session state). It doesn't know about connections or sessions;
//! it only knows how to turn bytes into typed events and back.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope → EventKind) → Hub (dispatch)
//! ```

mod codec;
mod error;
mod event;
mod message;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use event::{Envelope, EventKind, Marking, Signal, SignalKind};
pub use message::{MarkState, ServerMessage};
pub use types::{AttendanceStatus, ClassId, Identity, Role, UserId};
