//! Error types for the session layer.

use rollcall_protocol::{ClassId, Role};

/// Errors that can occur around identity and session state.
///
/// The `Display` text of `Forbidden`, `NoActiveSession` and `Finalizing`
/// is sent to clients verbatim inside `ERROR` messages.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The [`Authenticator`](crate::Authenticator) rejected the token.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The caller's role may not send this event. Carries the role that
    /// WOULD have been allowed.
    #[error("Forbidden, {0} event only")]
    Forbidden(Role),

    /// The event needs an attendance session and none is running.
    #[error("No active attendance session")]
    NoActiveSession,

    /// The session is being finalized and no longer accepts changes.
    #[error("Attendance session is being finalized")]
    Finalizing,

    /// A session is already running and the restart policy forbids
    /// replacing it.
    #[error("attendance session already active for class {0}")]
    AlreadyActive(ClassId),
}
