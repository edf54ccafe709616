//! Error types for the registry layer.

use rollcall_protocol::{ProtocolError, UserId};
use rollcall_transport::ConnectionId;

/// Errors that can occur during registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The connection id is already in the registry. Connection ids are
    /// unique, so this points at a double registration bug.
    #[error("connection {0} already registered")]
    AlreadyRegistered(ConnectionId),

    /// A relay named a user with no live connection. The text is sent to
    /// the relaying client.
    #[error("target peer not connected")]
    PeerNotConnected(UserId),

    /// The write to the selected connection failed; it has been dropped.
    #[error("delivery to {0} failed")]
    DeliveryFailed(ConnectionId),

    /// The outbound message could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
