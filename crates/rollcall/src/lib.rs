//! # Rollcall
//!
//! Live classroom attendance over WebSocket.
//!
//! A teacher marks students present or absent while everyone connected
//! sees the marks as they happen. When the teacher is done, unmarked
//! students default to absent, one record per student is written to the
//! store, and everyone receives the final counts. The same socket also
//! relays WebRTC signaling between two participants.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rollcall::prelude::*;
//!
//! # async fn run() -> Result<(), RollcallError> {
//! let auth = StaticTokens::new()
//!     .with("teacher-token", Identity::teacher("t1"))
//!     .with("ada-token", Identity::student("s1"));
//! let store = MemoryStore::new().with_class("c1", ["s1", "s2"]);
//!
//! let server = RollcallServerBuilder::new()
//!     .bind("0.0.0.0:8080")
//!     .build(auth, store)
//!     .await?;
//! server.hub().start_attendance(ClassId::new("c1")).await?;
//! server.run().await
//! # }
//! ```
//!
//! ## Layers
//!
//! ```text
//! rollcall-transport   sockets, handshake gate
//! rollcall-protocol    envelopes, events, outbound messages
//! rollcall-session     tokens → identities, the active session
//! rollcall-registry    who is connected, broadcast, relay
//! rollcall-store       roster, records, room marker, names
//! rollcall (this)      the hub, finalization, the server loop
//! ```

mod config;
mod error;
mod finalize;
mod gate;
mod handler;
mod hub;
mod server;

#[cfg(test)]
mod testing;

pub use config::HubConfig;
pub use error::RollcallError;
pub use finalize::DONE_MESSAGE;
pub use gate::{AuthGate, TOKEN_PARAM};
pub use handler::serve_connection;
pub use hub::{Hub, SessionStarted, UNKNOWN_NAME};
pub use server::{RollcallServer, RollcallServerBuilder, WsHub};

/// Everything needed to stand up a server.
pub mod prelude {
    pub use crate::{
        Hub, HubConfig, RollcallError, RollcallServer, RollcallServerBuilder,
        SessionStarted,
    };
    pub use rollcall_protocol::{
        AttendanceStatus, ClassId, Identity, Role, UserId,
    };
    pub use rollcall_registry::RelayPolicy;
    pub use rollcall_session::{
        Authenticator, RestartPolicy, SessionConfig, SessionError,
        StaticTokens,
    };
    pub use rollcall_store::{
        AttendanceRecord, AttendanceStore, ClassStore, MemoryStore,
        RoomMarker, RosterSource, StoreError, UserDirectory,
    };
}
