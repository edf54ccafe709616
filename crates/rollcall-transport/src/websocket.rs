//! WebSocket transport implementation using `tokio-tungstenite`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};
use tokio_tungstenite::tungstenite::http::StatusCode;

use crate::{
    Connection, ConnectionId, HandshakeGate, HandshakeRequest, Rejection,
    Transport, TransportError,
};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self { listener })
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Incoming = PendingConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Incoming, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::debug!(%addr, "accepted TCP connection");
        Ok(PendingConnection { stream, addr })
    }
}

/// A TCP socket waiting for its WebSocket upgrade.
pub struct PendingConnection {
    stream: TcpStream,
    addr: SocketAddr,
}

impl PendingConnection {
    /// The remote address of the socket.
    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Runs the HTTP upgrade, consulting `gate` before accepting it.
    ///
    /// A rejected request is answered with the rejection's status and
    /// body and reported as [`TransportError::Rejected`]; the socket is
    /// never upgraded. The whole exchange is bounded by `timeout`.
    pub async fn upgrade<G: HandshakeGate>(
        self,
        gate: &G,
        timeout: Duration,
    ) -> Result<(WebSocketConnection, G::Admitted), TransportError> {
        let addr = self.addr;
        let mut verdict: Option<Result<G::Admitted, Rejection>> = None;

        let callback = |req: &Request,
                        resp: Response|
         -> Result<Response, ErrorResponse> {
            let request =
                HandshakeRequest::new(req.uri().path(), req.uri().query());
            match gate.admit(&request) {
                Ok(admitted) => {
                    verdict = Some(Ok(admitted));
                    Ok(resp)
                }
                Err(rejection) => {
                    let mut error =
                        ErrorResponse::new(Some(rejection.reason.clone()));
                    *error.status_mut() = StatusCode::from_u16(
                        rejection.status,
                    )
                    .unwrap_or(StatusCode::UNAUTHORIZED);
                    verdict = Some(Err(rejection));
                    Err(error)
                }
            }
        };

        let upgraded = tokio::time::timeout(
            timeout,
            tokio_tungstenite::accept_hdr_async(self.stream, callback),
        )
        .await
        .map_err(|_| TransportError::HandshakeTimeout)?;

        let (ws, admitted) = match (upgraded, verdict) {
            (Ok(ws), Some(Ok(admitted))) => (ws, admitted),
            (_, Some(Err(rejection))) => {
                tracing::debug!(
                    %addr,
                    status = rejection.status,
                    reason = %rejection.reason,
                    "handshake rejected"
                );
                return Err(TransportError::Rejected(rejection));
            }
            (Err(e), _) => {
                return Err(TransportError::HandshakeFailed(
                    std::io::Error::new(
                        std::io::ErrorKind::ConnectionRefused,
                        e,
                    ),
                ));
            }
            (Ok(_), None) => {
                return Err(TransportError::HandshakeFailed(
                    std::io::Error::other(
                        "upgrade completed without a gate verdict",
                    ),
                ));
            }
        };

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, %addr, "upgraded WebSocket connection");

        let (sink, stream) = ws.split();
        Ok((
            WebSocketConnection {
                id,
                addr,
                sink: Mutex::new(sink),
                stream: Mutex::new(stream),
            },
            admitted,
        ))
    }
}

/// A single WebSocket connection.
///
/// The socket is split so that a reader parked in [`Connection::recv`]
/// never holds the lock a broadcasting writer needs.
pub struct WebSocketConnection {
    id: ConnectionId,
    addr: SocketAddr,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl WebSocketConnection {
    /// The remote address of the peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        // Browsers expect JSON in text frames.
        let msg = match std::str::from_utf8(data) {
            Ok(text) => Message::text(text.to_owned()),
            Err(_) => Message::Binary(data.to_vec().into()),
        };
        self.sink.lock().await.send(msg).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        loop {
            let msg = self.stream.lock().await.next().await;
            match msg {
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.into()));
                }
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // skip ping/pong/frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink.lock().await.close().await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
