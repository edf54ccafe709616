//! Per-connection handler: register, announce, read loop, clean up.
//!
//! Each upgraded connection gets its own Tokio task running
//! [`serve_connection`]. The flow is:
//!   1. Register the connection with the identity the handshake resolved
//!   2. Announce `PEER_JOINED` to everyone else
//!   3. Loop: receive a frame → `Hub::handle_frame`
//!   4. On close or read error, unregister (via drop guard)

use std::sync::Arc;

use rollcall_protocol::Identity;
use rollcall_registry::Registered;
use rollcall_store::ClassStore;
use rollcall_transport::{Connection, ConnectionId};

use crate::{Hub, RollcallError};

/// Drop guard that unregisters a connection when its handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async lock.
struct RegistrationGuard<C: Connection, S: ClassStore> {
    conn_id: ConnectionId,
    hub: Arc<Hub<C, S>>,
}

impl<C: Connection, S: ClassStore> Drop for RegistrationGuard<C, S> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let hub = Arc::clone(&self.hub);
        tokio::spawn(async move {
            hub.disconnect(conn_id).await;
        });
    }
}

/// Serves one admitted connection until it closes.
///
/// # Errors
/// Only if registration fails, which means the connection id was reused.
pub async fn serve_connection<C, S>(
    hub: Arc<Hub<C, S>>,
    conn: Arc<C>,
    identity: Identity,
) -> Result<(), RollcallError>
where
    C: Connection,
    S: ClassStore,
{
    let conn_id = conn.id();

    // --- Step 1: Register ---
    hub.registry()
        .register(Arc::clone(&conn), identity.clone())
        .await?;
    let _guard = RegistrationGuard {
        conn_id,
        hub: Arc::clone(&hub),
    };
    tracing::info!(%conn_id, user = %identity, "client connected");

    let me = Registered { conn, identity };

    // --- Step 2: Announce ---
    hub.announce_peer(&me).await;

    // --- Step 3: Message loop ---
    loop {
        match me.conn.recv().await {
            Ok(Some(frame)) => hub.handle_frame(&me, &frame).await,
            Ok(None) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        }
    }

    let _ = me.conn.close().await;
    // _guard drops here → unregister fires.
    Ok(())
}
