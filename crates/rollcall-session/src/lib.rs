//! Attendance session state and identity for Rollcall.
//!
//! This crate handles two things:
//!
//! 1. **Authentication**: turning a bearer token into an [`Identity`]
//!    ([`Authenticator`] trait, [`StaticTokens`] for fixtures and tests)
//! 2. **The session store**: the single optional in-progress attendance
//!    [`Session`] and the only four legal transitions on it
//!    ([`SessionStore`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Hub (above)  ← dispatches events, reads and mutates the session
//!     ↕
//! Session Layer (this crate)  ← identity + attendance state
//!     ↕
//! Protocol Layer (below)  ← provides Identity, ClassId, AttendanceStatus
//! ```
//!
//! [`Identity`]: rollcall_protocol::Identity

mod auth;
mod error;
mod session;
mod store;

pub use auth::{Authenticator, StaticTokens};
pub use error::SessionError;
pub use session::{
    AttendanceMap, AttendanceSummary, RestartPolicy, Session, SessionConfig,
    generate_room_id,
};
pub use store::SessionStore;
