//! `RollcallServer` builder and server loop.
//!
//! This is the entry point for running the hub over WebSocket. It ties
//! together all the layers: transport → gate → hub → registry/session.

use std::sync::Arc;

use rollcall_session::Authenticator;
use rollcall_store::ClassStore;
use rollcall_transport::{
    PendingConnection, Transport, TransportError, WebSocketConnection,
    WebSocketTransport,
};

use crate::handler::serve_connection;
use crate::{AuthGate, Hub, HubConfig, RollcallError};

/// The hub as served over WebSocket.
pub type WsHub<S> = Hub<WebSocketConnection, S>;

/// Builder for configuring and starting a Rollcall server.
///
/// # Example
///
/// ```rust,no_run
/// use rollcall::prelude::*;
///
/// # async fn run() -> Result<(), RollcallError> {
/// let auth = StaticTokens::new().with("t-token", Identity::teacher("t1"));
/// let store = MemoryStore::new().with_class("c1", ["s1", "s2"]);
///
/// let server = RollcallServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .build(auth, store)
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct RollcallServerBuilder {
    bind_addr: String,
    hub_config: HubConfig,
}

impl RollcallServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            hub_config: HubConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the hub configuration.
    pub fn hub_config(mut self, config: HubConfig) -> Self {
        self.hub_config = config;
        self
    }

    /// Binds the listener and builds the hub.
    pub async fn build<A, S>(
        self,
        auth: A,
        store: S,
    ) -> Result<RollcallServer<A, S>, RollcallError>
    where
        A: Authenticator,
        S: ClassStore,
    {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        Ok(RollcallServer {
            transport,
            gate: Arc::new(AuthGate::new(auth)),
            hub: Arc::new(Hub::new(store, self.hub_config)),
        })
    }
}

impl Default for RollcallServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A Rollcall server, bound and ready to accept.
///
/// Call [`run()`](Self::run) to start accepting connections. Keep a
/// [`hub()`](Self::hub) handle first if something else (a REST layer, a
/// CLI flag) needs to start attendance sessions.
pub struct RollcallServer<A, S> {
    transport: WebSocketTransport,
    gate: Arc<AuthGate<A>>,
    hub: Arc<WsHub<S>>,
}

impl<A, S> RollcallServer<A, S>
where
    A: Authenticator,
    S: ClassStore,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// A shared handle to the hub.
    pub fn hub(&self) -> Arc<WsHub<S>> {
        Arc::clone(&self.hub)
    }

    /// Runs the server accept loop.
    ///
    /// Accepts TCP connections and spawns a task for each; the upgrade
    /// and token check happen inside that task. Runs until the process
    /// is terminated.
    pub async fn run(mut self) -> Result<(), RollcallError> {
        tracing::info!("Rollcall server running");

        loop {
            match self.transport.accept().await {
                Ok(pending) => {
                    let gate = Arc::clone(&self.gate);
                    let hub = Arc::clone(&self.hub);
                    tokio::spawn(async move {
                        if let Err(e) = handle_pending(pending, gate, hub).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Upgrades one socket and, if the gate admits it, serves it.
async fn handle_pending<A, S>(
    pending: PendingConnection,
    gate: Arc<AuthGate<A>>,
    hub: Arc<WsHub<S>>,
) -> Result<(), RollcallError>
where
    A: Authenticator,
    S: ClassStore,
{
    let addr = pending.peer_addr();
    let timeout = hub.config().handshake_timeout;

    let (conn, identity) = match pending.upgrade(gate.as_ref(), timeout).await {
        Ok(admitted) => admitted,
        Err(TransportError::Rejected(rejection)) => {
            tracing::info!(%addr, reason = %rejection.reason, "handshake refused");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    serve_connection(hub, Arc::new(conn), identity).await
}
