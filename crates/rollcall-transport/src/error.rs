use crate::Rejection;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding or accepting TCP connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The handshake gate refused the upgrade. The client has already
    /// been answered with the rejection's HTTP status.
    #[error("handshake rejected ({}): {}", .0.status, .0.reason)]
    Rejected(Rejection),

    /// The WebSocket upgrade itself failed (bad request, I/O error).
    #[error("handshake failed: {0}")]
    HandshakeFailed(#[source] std::io::Error),

    /// The client did not finish the upgrade in time.
    #[error("handshake timed out")]
    HandshakeTimeout,

    /// The transport was shut down.
    #[error("transport shut down")]
    Shutdown,
}
