//! Unified error type for Rollcall.

use rollcall_protocol::ProtocolError;
use rollcall_registry::RegistryError;
use rollcall_session::SessionError;
use rollcall_store::StoreError;
use rollcall_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RollcallError {
    /// A transport-level error (bind, upgrade, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (decode, unknown event, bad payload).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (role, no session, restart refused).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A registry-level error (relay target missing, delivery failed).
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A persistence collaborator failed outside finalization.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Finalization could not read the class roster; the session is
    /// left untouched.
    #[error("failed to fetch class")]
    RosterUnavailable(#[source] StoreError),
}

impl RollcallError {
    /// The text to put in an `ERROR` message to the client that caused
    /// this error, or `None` if the error is server-side only.
    pub fn client_message(&self) -> Option<String> {
        match self {
            Self::Protocol(ProtocolError::Decode(_)) => {
                Some("invalid message".to_string())
            }
            Self::Protocol(ProtocolError::Encode(_)) => None,
            Self::Protocol(e) => Some(e.to_string()),
            Self::Session(e) => Some(e.to_string()),
            Self::Registry(e @ RegistryError::PeerNotConnected(_)) => {
                Some(e.to_string())
            }
            Self::Registry(_) => None,
            Self::RosterUnavailable(_) => Some(self.to_string()),
            Self::Transport(_) | Self::Store(_) => None,
        }
    }
}
