//! Writing to registered connections: broadcast and relay.
//!
//! Both operations follow the same shape:
//!
//! ```text
//! encode once → snapshot (shared lock, released) → write → on failure:
//!                                                  close + unregister
//! ```
//!
//! A write failure is an implicit disconnect of that one connection. It
//! never aborts delivery to the others and is never reported back to the
//! sender of the original event.

use std::collections::HashSet;

use futures_util::future::join_all;
use rollcall_protocol::{Codec, Identity, ProtocolError, ServerMessage, Signal};
use rollcall_transport::{Connection, ConnectionId};

use crate::{ConnectionRegistry, Registered, RegistryError};

/// The outcome of one broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Connections the message was written to.
    pub delivered: Vec<ConnectionId>,
    /// Connections whose write failed and that were unregistered.
    pub dropped: Vec<ConnectionId>,
}

impl<C: Connection> ConnectionRegistry<C> {
    /// Writes `message` to every registered connection not in `exclude`.
    ///
    /// Writes run concurrently against a snapshot, so a slow client only
    /// delays itself.
    ///
    /// # Errors
    /// Only if `message` cannot be encoded, in which case nothing is sent.
    pub async fn broadcast<K: Codec>(
        &self,
        codec: &K,
        message: &ServerMessage,
        exclude: &HashSet<ConnectionId>,
    ) -> Result<FanoutReport, ProtocolError> {
        let bytes = codec.encode(message)?;
        let targets: Vec<Registered<C>> = self
            .snapshot()
            .await
            .into_iter()
            .filter(|entry| !exclude.contains(&entry.id()))
            .collect();

        let results = join_all(targets.iter().map(|entry| entry.conn.send(&bytes))).await;

        let mut report = FanoutReport::default();
        for (entry, result) in targets.iter().zip(results) {
            match result {
                Ok(()) => report.delivered.push(entry.id()),
                Err(e) => {
                    self.drop_connection(entry, &e).await;
                    report.dropped.push(entry.id());
                }
            }
        }

        tracing::debug!(
            event = message.event_name(),
            delivered = report.delivered.len(),
            dropped = report.dropped.len(),
            "broadcast"
        );
        Ok(report)
    }

    /// Delivers a signaling message to exactly one connection of its
    /// target user, stamped with `sender`'s identity.
    ///
    /// The connection is picked by the registry's
    /// [`RelayPolicy`](crate::RelayPolicy). Returns the id it went to.
    ///
    /// # Errors
    /// - [`RegistryError::PeerNotConnected`] if the target has no live
    ///   connection; nothing is sent.
    /// - [`RegistryError::DeliveryFailed`] if the write failed; that
    ///   connection has been closed and unregistered.
    pub async fn relay<K: Codec>(
        &self,
        codec: &K,
        sender: &Identity,
        signal: Signal,
    ) -> Result<ConnectionId, RegistryError> {
        let target = self
            .find_user(&signal.target)
            .await
            .ok_or_else(|| RegistryError::PeerNotConnected(signal.target.clone()))?;

        let kind = signal.kind;
        let bytes = codec.encode(&signal.into_relayed(sender))?;
        if let Err(e) = target.conn.send(&bytes).await {
            self.drop_connection(&target, &e).await;
            return Err(RegistryError::DeliveryFailed(target.id()));
        }

        tracing::debug!(
            event = kind.event_name(),
            from = %sender,
            to = %target.identity,
            conn_id = %target.id(),
            "relayed signal"
        );
        Ok(target.id())
    }

    /// Writes `message` to a single registered connection.
    ///
    /// # Errors
    /// [`RegistryError::DeliveryFailed`] if `id` is not registered or the
    /// write failed (the connection is dropped in the latter case).
    pub async fn send_to<K: Codec>(
        &self,
        codec: &K,
        id: ConnectionId,
        message: &ServerMessage,
    ) -> Result<(), RegistryError> {
        let entry = self
            .get(id)
            .await
            .ok_or(RegistryError::DeliveryFailed(id))?;
        let bytes = codec.encode(message)?;
        if let Err(e) = entry.conn.send(&bytes).await {
            self.drop_connection(&entry, &e).await;
            return Err(RegistryError::DeliveryFailed(id));
        }
        Ok(())
    }

    async fn drop_connection(&self, entry: &Registered<C>, error: &C::Error) {
        tracing::warn!(
            conn_id = %entry.id(),
            user = %entry.identity,
            error = %error,
            "write failed, dropping connection"
        );
        let _ = entry.conn.close().await;
        self.unregister(entry.id()).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rollcall_protocol::{AttendanceStatus, JsonCodec, SignalKind, UserId};
    use serde_json::{Map, Value, json};

    use super::*;
    use crate::RelayPolicy;
    use crate::mock::MockConnection;

    async fn registry_with(
        entries: Vec<(Arc<MockConnection>, Identity)>,
    ) -> ConnectionRegistry<MockConnection> {
        let registry = ConnectionRegistry::new(RelayPolicy::FirstConnected);
        for (conn, identity) in entries {
            registry.register(conn, identity).await.unwrap();
        }
        registry
    }

    fn marked() -> ServerMessage {
        ServerMessage::AttendanceMarked {
            student_id: UserId::new("s1"),
            status: AttendanceStatus::Present,
        }
    }

    fn offer_to(target: &str) -> Signal {
        let mut data = Map::new();
        data.insert("targetId".into(), Value::String(target.into()));
        data.insert("sdp".into(), json!("v=0"));
        Signal::from_data(SignalKind::Offer, data).unwrap()
    }

    // =====================================================================
    // broadcast
    // =====================================================================

    #[tokio::test]
    async fn test_broadcast_reaches_everyone_not_excluded() {
        let a = Arc::new(MockConnection::new(1));
        let b = Arc::new(MockConnection::new(2));
        let c = Arc::new(MockConnection::new(3));
        let registry = registry_with(vec![
            (a.clone(), Identity::teacher("t1")),
            (b.clone(), Identity::student("s1")),
            (c.clone(), Identity::student("s2")),
        ])
        .await;

        let exclude = HashSet::from([ConnectionId::new(2)]);
        let report = registry
            .broadcast(&JsonCodec, &marked(), &exclude)
            .await
            .unwrap();

        assert_eq!(report.delivered, vec![ConnectionId::new(1), ConnectionId::new(3)]);
        assert!(report.dropped.is_empty());
        assert_eq!(a.sent_json()[0]["event"], "ATTENDANCE_MARKED");
        assert!(b.sent_json().is_empty());
        assert_eq!(c.sent_json().len(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_failed_write_drops_only_that_connection() {
        let ok1 = Arc::new(MockConnection::new(1));
        let bad = Arc::new(MockConnection::failing(2));
        let ok2 = Arc::new(MockConnection::new(3));
        let registry = registry_with(vec![
            (ok1.clone(), Identity::teacher("t1")),
            (bad.clone(), Identity::student("s1")),
            (ok2.clone(), Identity::student("s2")),
        ])
        .await;

        let report = registry
            .broadcast(&JsonCodec, &marked(), &HashSet::new())
            .await
            .unwrap();

        assert_eq!(report.dropped, vec![ConnectionId::new(2)]);
        assert_eq!(ok1.sent_json().len(), 1);
        assert_eq!(ok2.sent_json().len(), 1);
        assert!(bad.is_closed());
        assert!(registry.lookup(ConnectionId::new(2)).await.is_none());
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_broadcast_empty_registry_is_noop() {
        let registry = ConnectionRegistry::<MockConnection>::default();
        let report = registry
            .broadcast(&JsonCodec, &marked(), &HashSet::new())
            .await
            .unwrap();
        assert_eq!(report, FanoutReport::default());
    }

    // =====================================================================
    // relay
    // =====================================================================

    #[tokio::test]
    async fn test_relay_stamps_sender_and_reaches_only_target() {
        let teacher = Arc::new(MockConnection::new(1));
        let s1 = Arc::new(MockConnection::new(2));
        let s2 = Arc::new(MockConnection::new(3));
        let registry = registry_with(vec![
            (teacher.clone(), Identity::teacher("t1")),
            (s1.clone(), Identity::student("s1")),
            (s2.clone(), Identity::student("s2")),
        ])
        .await;

        let to = registry
            .relay(&JsonCodec, &Identity::student("s1"), offer_to("t1"))
            .await
            .unwrap();

        assert_eq!(to, ConnectionId::new(1));
        let frames = teacher.sent_json();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["event"], "WEBRTC_OFFER");
        assert_eq!(frames[0]["data"]["fromId"], "s1");
        assert_eq!(frames[0]["data"]["fromRole"], "student");
        assert_eq!(frames[0]["data"]["sdp"], "v=0");
        assert!(s1.sent_json().is_empty());
        assert!(s2.sent_json().is_empty());
    }

    #[tokio::test]
    async fn test_relay_absent_target_is_peer_not_connected() {
        let s1 = Arc::new(MockConnection::new(1));
        let registry = registry_with(vec![(s1.clone(), Identity::student("s1"))]).await;

        let err = registry
            .relay(&JsonCodec, &Identity::student("s1"), offer_to("t1"))
            .await
            .unwrap_err();

        assert!(matches!(err, RegistryError::PeerNotConnected(ref u) if u.as_str() == "t1"));
        assert_eq!(err.to_string(), "target peer not connected");
        assert!(s1.sent_json().is_empty());
    }

    #[tokio::test]
    async fn test_relay_duplicate_user_delivers_once() {
        let first = Arc::new(MockConnection::new(1));
        let second = Arc::new(MockConnection::new(2));
        let registry = registry_with(vec![
            (first.clone(), Identity::teacher("t1")),
            (second.clone(), Identity::teacher("t1")),
        ])
        .await;

        registry
            .relay(&JsonCodec, &Identity::student("s1"), offer_to("t1"))
            .await
            .unwrap();

        assert_eq!(first.sent_json().len() + second.sent_json().len(), 1);
        assert_eq!(first.sent_json().len(), 1);
    }

    #[tokio::test]
    async fn test_relay_failed_write_drops_target() {
        let bad = Arc::new(MockConnection::failing(1));
        let registry = registry_with(vec![(bad.clone(), Identity::teacher("t1"))]).await;

        let err = registry
            .relay(&JsonCodec, &Identity::student("s1"), offer_to("t1"))
            .await
            .unwrap_err();

        assert!(matches!(err, RegistryError::DeliveryFailed(_)));
        assert!(bad.is_closed());
        assert!(registry.is_empty().await);
    }

    // =====================================================================
    // send_to
    // =====================================================================

    #[tokio::test]
    async fn test_send_to_unknown_connection_fails() {
        let registry = ConnectionRegistry::<MockConnection>::default();
        let err = registry
            .send_to(&JsonCodec, ConnectionId::new(4), &ServerMessage::error("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::DeliveryFailed(_)));
    }

    #[tokio::test]
    async fn test_send_to_registered_connection_writes_once() {
        let a = Arc::new(MockConnection::new(1));
        let registry = registry_with(vec![(a.clone(), Identity::teacher("t1"))]).await;

        registry
            .send_to(&JsonCodec, ConnectionId::new(1), &ServerMessage::error("nope"))
            .await
            .unwrap();

        let frames = a.sent_json();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0], json!({"event": "ERROR", "data": {"message": "nope"}}));
    }
}
