//! The hub: one object owning the registry and the session store, shared
//! by every connection task.
//!
//! Each inbound frame goes through the same pipeline:
//!
//! ```text
//! bytes → Envelope (decode) → EventKind (closed tag) → role check
//!       → session check → payload check → handler → broadcast / unicast
//! ```
//!
//! Any step may refuse. A refusal becomes an `ERROR` to the sender only;
//! the connection stays open and the loop reads the next frame.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rollcall_protocol::{
    ClassId, Codec, Envelope, EventKind, Identity, JsonCodec, MarkState,
    Marking, Role, ServerMessage, Signal,
};
use rollcall_registry::{ConnectionRegistry, FanoutReport, Registered};
use rollcall_session::{
    RestartPolicy, Session, SessionError, SessionStore, generate_room_id,
};
use rollcall_store::{ClassStore, StoreError};
use rollcall_transport::{Connection, ConnectionId};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{HubConfig, RollcallError};

/// Display name used when the directory cannot resolve a user.
pub const UNKNOWN_NAME: &str = "Unknown";

/// What [`Hub::start_attendance`] reports back to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStarted {
    pub class_id: ClassId,
    pub room_id: String,
    pub started_at: DateTime<Utc>,
}

/// The live attendance hub.
///
/// Generic over the connection type (so tests can drive it without
/// sockets) and the persistence collaborator.
pub struct Hub<C, S> {
    registry: ConnectionRegistry<C>,
    sessions: SessionStore,
    store: S,
    codec: JsonCodec,
    config: HubConfig,
}

impl<C: Connection, S: ClassStore> Hub<C, S> {
    /// Creates a hub with an empty registry and no active session.
    pub fn new(store: S, config: HubConfig) -> Self {
        Self {
            registry: ConnectionRegistry::new(config.relay_policy),
            sessions: SessionStore::new(config.session.clone()),
            store,
            codec: JsonCodec,
            config,
        }
    }

    /// The connection registry.
    pub fn registry(&self) -> &ConnectionRegistry<C> {
        &self.registry
    }

    /// The session store.
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// The persistence collaborator.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The configuration the hub was built with.
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    // =====================================================================
    // Session start (called by the REST layer)
    // =====================================================================

    /// Starts an attendance session for `class_id`.
    ///
    /// Generates a room id, records it as the class's active room, then
    /// installs the session. The caller is responsible for checking that
    /// the requester owns the class.
    ///
    /// # Errors
    /// - [`SessionError::AlreadyActive`] under [`RestartPolicy::Reject`]
    /// - [`StoreError`] if the room marker could not be set; no session
    ///   is installed in that case
    pub async fn start_attendance(
        &self,
        class_id: ClassId,
    ) -> Result<SessionStarted, RollcallError> {
        if self.config.session.restart == RestartPolicy::Reject {
            if let Some(active) = self.sessions.get().await {
                return Err(SessionError::AlreadyActive(active.class_id).into());
            }
        }

        let room_id = generate_room_id();
        bounded(
            self.config.store_timeout,
            self.store.set_active_room(&class_id, &room_id),
        )
        .await?;

        let session = self.sessions.start(class_id, room_id).await?;
        Ok(SessionStarted {
            class_id: session.class_id,
            room_id: session.room_id,
            started_at: session.started_at,
        })
    }

    // =====================================================================
    // Peer announcement
    // =====================================================================

    /// Tells every other connection that `joined` has arrived.
    ///
    /// The display name comes from the user directory, bounded by
    /// `lookup_timeout`; any failure yields `"Unknown"`. Only the new
    /// connection itself is excluded, so the same user's other tabs are
    /// told too.
    pub async fn announce_peer(&self, joined: &Registered<C>) -> FanoutReport {
        let user = &joined.identity.user_id;
        let name = match bounded(
            self.config.lookup_timeout,
            self.store.display_name(user),
        )
        .await
        {
            Ok(name) => name,
            Err(e) => {
                tracing::debug!(%user, error = %e, "display name lookup failed");
                UNKNOWN_NAME.to_string()
            }
        };

        let message = ServerMessage::PeerJoined {
            user_id: user.clone(),
            role: joined.identity.role,
            name,
        };
        let exclude = HashSet::from([joined.id()]);
        // PeerJoined always encodes.
        self.registry
            .broadcast(&self.codec, &message, &exclude)
            .await
            .unwrap_or_default()
    }

    // =====================================================================
    // Event routing
    // =====================================================================

    /// Handles one inbound frame from `sender`.
    ///
    /// Never fails: every refusal is reported to the sender as an
    /// `ERROR` message, and server-side failures are logged.
    pub async fn handle_frame(&self, sender: &Registered<C>, frame: &[u8]) {
        let result = match self.codec.decode::<Envelope>(frame) {
            Ok(envelope) => match EventKind::parse(&envelope.event) {
                Ok(kind) => self.dispatch(sender, kind, envelope.data).await,
                Err(e) => Err(e.into()),
            },
            Err(e) => Err(e.into()),
        };

        if let Err(e) = result {
            self.report(sender, &e).await;
        }
    }

    /// Runs the handler for `kind`. The match is exhaustive over
    /// [`EventKind`], so a new event cannot be left unrouted.
    pub async fn dispatch(
        &self,
        sender: &Registered<C>,
        kind: EventKind,
        data: Map<String, Value>,
    ) -> Result<(), RollcallError> {
        tracing::debug!(
            conn_id = %sender.id(),
            user = %sender.identity,
            event = kind.as_str(),
            "dispatching event"
        );

        match kind {
            EventKind::AttendanceMarked => {
                require_role(&sender.identity, Role::Teacher)?;
                self.require_session().await?;
                let marking = Marking::from_data(&data)?;
                self.mark(marking).await
            }
            EventKind::TodaySummary => {
                require_role(&sender.identity, Role::Teacher)?;
                let session = self.require_session().await?;
                let summary = session.summary();
                let message = ServerMessage::TodaySummary {
                    present: summary.present,
                    absent: summary.absent,
                    total: summary.total,
                };
                self.registry
                    .broadcast(&self.codec, &message, &HashSet::new())
                    .await?;
                Ok(())
            }
            EventKind::MyAttendance => {
                require_role(&sender.identity, Role::Student)?;
                let session = self.require_session().await?;
                let status = session.status_of(&sender.identity.user_id);
                let message = ServerMessage::MyAttendance {
                    status: MarkState::from(status),
                };
                self.registry
                    .send_to(&self.codec, sender.id(), &message)
                    .await?;
                Ok(())
            }
            EventKind::Done => {
                require_role(&sender.identity, Role::Teacher)?;
                let session = self.require_session().await?;
                if session.finalizing {
                    return Err(SessionError::Finalizing.into());
                }
                self.finalize(session).await
            }
            EventKind::Signal(kind) => {
                let signal = Signal::from_data(kind, data)?;
                self.registry
                    .relay(&self.codec, &sender.identity, signal)
                    .await?;
                Ok(())
            }
        }
    }

    async fn mark(&self, marking: Marking) -> Result<(), RollcallError> {
        let Marking { student_id, status } = marking;
        // The session may have been finalized, or begun finalizing, since
        // the check.
        self.sessions
            .mutate_attendance(|attendance| {
                attendance.insert(student_id.clone(), status);
            })
            .await?;

        tracing::debug!(student = %student_id, %status, "attendance marked");
        let message = ServerMessage::AttendanceMarked { student_id, status };
        self.registry
            .broadcast(&self.codec, &message, &HashSet::new())
            .await?;
        Ok(())
    }

    async fn require_session(&self) -> Result<Session, SessionError> {
        self.sessions.get().await.ok_or(SessionError::NoActiveSession)
    }

    /// Sends the client-facing text of `error` back to `sender`, or just
    /// logs it if it is server-side only.
    async fn report(&self, sender: &Registered<C>, error: &RollcallError) {
        let Some(text) = error.client_message() else {
            tracing::warn!(
                conn_id = %sender.id(),
                user = %sender.identity,
                error = %error,
                "event failed"
            );
            return;
        };

        tracing::debug!(
            conn_id = %sender.id(),
            user = %sender.identity,
            reason = %text,
            "refusing event"
        );
        let message = ServerMessage::error(text);
        if let Err(e) = self
            .registry
            .send_to(&self.codec, sender.id(), &message)
            .await
        {
            tracing::debug!(conn_id = %sender.id(), error = %e, "error reply not delivered");
        }
    }

    pub(crate) fn codec(&self) -> &JsonCodec {
        &self.codec
    }

    /// Removes a connection. Idempotent.
    pub async fn disconnect(&self, id: ConnectionId) {
        if let Some(entry) = self.registry.unregister(id).await {
            tracing::info!(conn_id = %id, user = %entry.identity, "client disconnected");
        }
    }
}

fn require_role(identity: &Identity, role: Role) -> Result<(), SessionError> {
    if identity.role == role {
        Ok(())
    } else {
        Err(SessionError::Forbidden(role))
    }
}

/// Runs a store call with a time bound.
pub(crate) async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| StoreError::Timeout(limit))?
}

#[cfg(test)]
mod tests {
    //! Hub unit tests, driven through `TestConnection` so every frame a
    //! client would receive can be inspected.
    //!
    //! Naming convention: `test_{function}_{scenario}_{expected}`.

    use std::sync::Arc;
    use std::time::Duration;

    use rollcall_protocol::{AttendanceStatus, UserId};
    use rollcall_registry::RelayPolicy;
    use rollcall_session::SessionConfig;
    use rollcall_store::MemoryStore;
    use serde_json::json;

    use super::*;
    use crate::testing::{TestConnection, frame};

    type TestHub = Hub<TestConnection, MemoryStore>;

    fn hub_with(store: MemoryStore, config: HubConfig) -> TestHub {
        Hub::new(store, config)
    }

    fn hub() -> TestHub {
        hub_with(
            MemoryStore::new()
                .with_class("c1", ["s1", "s2"])
                .with_user("t1", "Ms. Lovelace")
                .with_user("s1", "Ada"),
            HubConfig::default(),
        )
    }

    async fn join(
        hub: &TestHub,
        id: u64,
        identity: Identity,
    ) -> (Arc<TestConnection>, Registered<TestConnection>) {
        let conn = Arc::new(TestConnection::new(id));
        hub.registry()
            .register(Arc::clone(&conn), identity.clone())
            .await
            .unwrap();
        let entry = Registered {
            conn: Arc::clone(&conn),
            identity,
        };
        (conn, entry)
    }

    async fn start(hub: &TestHub) {
        hub.start_attendance(ClassId::new("c1")).await.unwrap();
    }

    // =====================================================================
    // handle_frame: decoding and unknown tags
    // =====================================================================

    #[tokio::test]
    async fn test_handle_frame_malformed_json_replies_invalid_message() {
        let hub = hub();
        let (conn, teacher) = join(&hub, 1, Identity::teacher("t1")).await;

        hub.handle_frame(&teacher, b"{not json").await;

        assert_eq!(conn.last_error().as_deref(), Some("invalid message"));
        assert_eq!(hub.registry().len().await, 1);
    }

    #[tokio::test]
    async fn test_handle_frame_unknown_event_replies_error_to_sender_only() {
        let hub = hub();
        let (sender, student) = join(&hub, 1, Identity::student("s1")).await;
        let (other, _) = join(&hub, 2, Identity::teacher("t1")).await;

        hub.handle_frame(&student, &frame("SELF_DESTRUCT", json!({})))
            .await;

        assert_eq!(sender.last_error().as_deref(), Some("unknown event type"));
        assert!(other.frames().is_empty());
    }

    // =====================================================================
    // ATTENDANCE_MARKED
    // =====================================================================

    #[tokio::test]
    async fn test_dispatch_mark_broadcasts_to_everyone() {
        let hub = hub();
        start(&hub).await;
        let (t_conn, teacher) = join(&hub, 1, Identity::teacher("t1")).await;
        let (s_conn, _) = join(&hub, 2, Identity::student("s1")).await;

        hub.handle_frame(
            &teacher,
            &frame(
                "ATTENDANCE_MARKED",
                json!({"studentId": "s1", "status": "present"}),
            ),
        )
        .await;

        let expected = json!({
            "event": "ATTENDANCE_MARKED",
            "data": {"studentId": "s1", "status": "present"}
        });
        assert_eq!(t_conn.frames(), vec![expected.clone()]);
        assert_eq!(s_conn.frames(), vec![expected]);
        let session = hub.sessions().get().await.unwrap();
        assert_eq!(
            session.status_of(&UserId::new("s1")),
            Some(AttendanceStatus::Present)
        );
    }

    #[tokio::test]
    async fn test_dispatch_mark_last_event_per_student_wins() {
        let hub = hub();
        start(&hub).await;
        let (_, teacher) = join(&hub, 1, Identity::teacher("t1")).await;

        for (student, status) in [
            ("s1", "present"),
            ("s2", "absent"),
            ("s1", "absent"),
            ("s3", "present"),
            ("s2", "present"),
        ] {
            hub.handle_frame(
                &teacher,
                &frame(
                    "ATTENDANCE_MARKED",
                    json!({"studentId": student, "status": status}),
                ),
            )
            .await;
        }

        let session = hub.sessions().get().await.unwrap();
        assert_eq!(session.status_of(&UserId::new("s1")), Some(AttendanceStatus::Absent));
        assert_eq!(session.status_of(&UserId::new("s2")), Some(AttendanceStatus::Present));
        assert_eq!(session.status_of(&UserId::new("s3")), Some(AttendanceStatus::Present));
        assert_eq!(session.attendance.len(), 3);
    }

    #[tokio::test]
    async fn test_dispatch_mark_by_student_is_forbidden_and_changes_nothing() {
        let hub = hub();
        start(&hub).await;
        let (conn, student) = join(&hub, 1, Identity::student("s1")).await;

        for (event, data) in [
            ("ATTENDANCE_MARKED", json!({"studentId": "s1", "status": "present"})),
            ("TODAY_SUMMARY", json!({})),
            ("DONE", json!({})),
        ] {
            hub.handle_frame(&student, &frame(event, data)).await;
            assert_eq!(
                conn.last_error().as_deref(),
                Some("Forbidden, teacher event only")
            );
        }

        assert_eq!(conn.frames().len(), 3);
        let session = hub.sessions().get().await.unwrap();
        assert!(session.attendance.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_mark_without_session_checked_before_payload() {
        let hub = hub();
        let (conn, teacher) = join(&hub, 1, Identity::teacher("t1")).await;

        hub.handle_frame(&teacher, &frame("ATTENDANCE_MARKED", json!({})))
            .await;

        assert_eq!(
            conn.last_error().as_deref(),
            Some("No active attendance session")
        );
    }

    #[tokio::test]
    async fn test_dispatch_mark_invalid_payload_is_rejected() {
        let hub = hub();
        start(&hub).await;
        let (conn, teacher) = join(&hub, 1, Identity::teacher("t1")).await;

        hub.handle_frame(
            &teacher,
            &frame("ATTENDANCE_MARKED", json!({"studentId": "", "status": "present"})),
        )
        .await;
        assert_eq!(conn.last_error().as_deref(), Some("invalid studentId"));

        hub.handle_frame(
            &teacher,
            &frame("ATTENDANCE_MARKED", json!({"studentId": "s1", "status": "late"})),
        )
        .await;
        assert_eq!(conn.last_error().as_deref(), Some("invalid status"));

        assert!(hub.sessions().get().await.unwrap().attendance.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_mark_concurrent_teachers_lose_no_update() {
        let hub = Arc::new(hub());
        start(&hub).await;
        let (_, teacher) = join(&hub, 1, Identity::teacher("t1")).await;

        let mut tasks = Vec::new();
        for i in 0..50 {
            let hub = Arc::clone(&hub);
            let teacher = teacher.clone();
            tasks.push(tokio::spawn(async move {
                hub.handle_frame(
                    &teacher,
                    &frame(
                        "ATTENDANCE_MARKED",
                        json!({"studentId": format!("s{i}"), "status": "present"}),
                    ),
                )
                .await;
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(hub.sessions().get().await.unwrap().attendance.len(), 50);
    }

    // =====================================================================
    // TODAY_SUMMARY / MY_ATTENDANCE
    // =====================================================================

    #[tokio::test]
    async fn test_dispatch_summary_counts_marked_students_only() {
        let hub = hub();
        start(&hub).await;
        let (t_conn, teacher) = join(&hub, 1, Identity::teacher("t1")).await;
        hub.sessions()
            .mutate_attendance(|m| {
                m.insert(UserId::new("s1"), AttendanceStatus::Present);
            })
            .await
            .unwrap();

        hub.handle_frame(&teacher, &frame("TODAY_SUMMARY", json!({}))).await;

        assert_eq!(
            t_conn.frames().last().unwrap(),
            &json!({
                "event": "TODAY_SUMMARY",
                "data": {"present": 1, "absent": 0, "total": 1}
            })
        );
    }

    #[tokio::test]
    async fn test_dispatch_my_attendance_unmarked_is_not_yet_updated() {
        let hub = hub();
        start(&hub).await;
        let (s_conn, student) = join(&hub, 1, Identity::student("s2")).await;
        let (other, _) = join(&hub, 2, Identity::student("s1")).await;

        hub.handle_frame(&student, &frame("MY_ATTENDANCE", json!({}))).await;

        assert_eq!(
            s_conn.frames(),
            vec![json!({"event": "MY_ATTENDANCE", "data": {"status": "not yet updated"}})]
        );
        assert!(other.frames().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_my_attendance_marked_reports_status() {
        let hub = hub();
        start(&hub).await;
        let (s_conn, student) = join(&hub, 1, Identity::student("s1")).await;
        hub.sessions()
            .mutate_attendance(|m| {
                m.insert(UserId::new("s1"), AttendanceStatus::Absent);
            })
            .await
            .unwrap();

        hub.handle_frame(&student, &frame("MY_ATTENDANCE", json!({}))).await;

        assert_eq!(s_conn.frames()[0]["data"]["status"], "absent");
    }

    #[tokio::test]
    async fn test_dispatch_my_attendance_without_session_is_error() {
        let hub = hub();
        let (conn, student) = join(&hub, 1, Identity::student("s1")).await;

        hub.handle_frame(&student, &frame("MY_ATTENDANCE", json!({}))).await;

        assert_eq!(
            conn.last_error().as_deref(),
            Some("No active attendance session")
        );
    }

    #[tokio::test]
    async fn test_dispatch_my_attendance_by_teacher_is_forbidden() {
        let hub = hub();
        start(&hub).await;
        let (conn, teacher) = join(&hub, 1, Identity::teacher("t1")).await;

        hub.handle_frame(&teacher, &frame("MY_ATTENDANCE", json!({}))).await;

        assert_eq!(
            conn.last_error().as_deref(),
            Some("Forbidden, student event only")
        );
    }

    // =====================================================================
    // Signal relay
    // =====================================================================

    #[tokio::test]
    async fn test_dispatch_signal_absent_target_errors_sender_only() {
        let hub = hub();
        let (a, sender) = join(&hub, 1, Identity::student("s1")).await;
        let (c, _) = join(&hub, 2, Identity::student("s2")).await;

        hub.handle_frame(
            &sender,
            &frame("WEBRTC_OFFER", json!({"targetId": "t1", "sdp": "v=0"})),
        )
        .await;

        assert_eq!(a.last_error().as_deref(), Some("target peer not connected"));
        assert_eq!(a.frames().len(), 1);
        assert!(c.frames().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_signal_missing_target_is_error() {
        let hub = hub();
        let (a, sender) = join(&hub, 1, Identity::teacher("t1")).await;

        hub.handle_frame(&sender, &frame("WEBRTC_ICE_CANDIDATE", json!({"candidate": {}})))
            .await;

        assert_eq!(
            a.last_error().as_deref(),
            Some("missing targetId in WebRTC message")
        );
    }

    #[tokio::test]
    async fn test_dispatch_signal_needs_no_session_and_stamps_sender() {
        let hub = hub();
        let (_, sender) = join(&hub, 1, Identity::teacher("t1")).await;
        let (target, _) = join(&hub, 2, Identity::student("s1")).await;

        hub.handle_frame(
            &sender,
            &frame(
                "WEBRTC_ANSWER",
                json!({"targetId": "s1", "sdp": "v=0", "fromRole": "student"}),
            ),
        )
        .await;

        let frames = target.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["event"], "WEBRTC_ANSWER");
        assert_eq!(frames[0]["data"]["fromId"], "t1");
        assert_eq!(frames[0]["data"]["fromRole"], "teacher");
    }

    #[tokio::test]
    async fn test_dispatch_signal_most_recent_policy_picks_newest() {
        let hub = hub_with(
            MemoryStore::new(),
            HubConfig {
                relay_policy: RelayPolicy::MostRecent,
                ..HubConfig::default()
            },
        );
        let (_, sender) = join(&hub, 1, Identity::student("s1")).await;
        let (old, _) = join(&hub, 2, Identity::teacher("t1")).await;
        let (new, _) = join(&hub, 3, Identity::teacher("t1")).await;

        hub.handle_frame(&sender, &frame("WEBRTC_OFFER", json!({"targetId": "t1"})))
            .await;

        assert!(old.frames().is_empty());
        assert_eq!(new.frames().len(), 1);
    }

    // =====================================================================
    // announce_peer
    // =====================================================================

    #[tokio::test]
    async fn test_announce_peer_excludes_only_new_connection() {
        let hub = hub();
        let (t_conn, _) = join(&hub, 1, Identity::teacher("t1")).await;
        let (first_tab, _) = join(&hub, 2, Identity::student("s1")).await;
        let (new_tab, entry) = join(&hub, 3, Identity::student("s1")).await;

        let report = hub.announce_peer(&entry).await;

        assert_eq!(report.delivered.len(), 2);
        let expected = json!({
            "event": "PEER_JOINED",
            "data": {"userId": "s1", "role": "student", "name": "Ada"}
        });
        assert_eq!(t_conn.frames(), vec![expected.clone()]);
        assert_eq!(first_tab.frames(), vec![expected]);
        assert!(new_tab.frames().is_empty());
    }

    #[tokio::test]
    async fn test_announce_peer_unknown_user_named_unknown() {
        let hub = hub();
        let (t_conn, _) = join(&hub, 1, Identity::teacher("t1")).await;
        let (_, entry) = join(&hub, 2, Identity::student("ghost")).await;

        hub.announce_peer(&entry).await;

        assert_eq!(t_conn.frames()[0]["data"]["name"], UNKNOWN_NAME);
    }

    #[tokio::test]
    async fn test_announce_peer_slow_directory_named_unknown() {
        let hub = hub_with(
            MemoryStore::new().with_user("s1", "Ada"),
            HubConfig {
                lookup_timeout: Duration::from_millis(20),
                ..HubConfig::default()
            },
        );
        hub.store().delay_directory(Duration::from_millis(500)).await;
        let (t_conn, _) = join(&hub, 1, Identity::teacher("t1")).await;
        let (_, entry) = join(&hub, 2, Identity::student("s1")).await;

        hub.announce_peer(&entry).await;

        assert_eq!(t_conn.frames()[0]["data"]["name"], UNKNOWN_NAME);
    }

    // =====================================================================
    // start_attendance
    // =====================================================================

    #[tokio::test]
    async fn test_start_attendance_marks_room_and_installs_session() {
        let hub = hub();
        let started = hub.start_attendance(ClassId::new("c1")).await.unwrap();

        assert_eq!(started.room_id.len(), 32);
        assert_eq!(
            hub.store().active_room(&ClassId::new("c1")).await,
            Some(started.room_id.clone())
        );
        let session = hub.sessions().get().await.unwrap();
        assert_eq!(session.room_id, started.room_id);
        assert!(session.attendance.is_empty());

        let json = serde_json::to_value(&started).unwrap();
        assert_eq!(json["classId"], "c1");
        assert!(json["startedAt"].is_string());
    }

    #[tokio::test]
    async fn test_start_attendance_marker_failure_installs_nothing() {
        let hub = hub();
        hub.store().fail_room_marker(true).await;

        let err = hub.start_attendance(ClassId::new("c1")).await.unwrap_err();

        assert!(matches!(err, RollcallError::Store(_)));
        assert!(hub.sessions().get().await.is_none());
    }

    #[tokio::test]
    async fn test_start_attendance_unknown_class_fails() {
        let hub = hub();
        let err = hub.start_attendance(ClassId::new("nope")).await.unwrap_err();
        assert!(matches!(err, RollcallError::Store(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_start_attendance_reject_policy_keeps_first_session() {
        let hub = hub_with(
            MemoryStore::new().with_class("c1", ["s1"]).with_class("c2", ["s2"]),
            HubConfig {
                session: SessionConfig {
                    restart: RestartPolicy::Reject,
                },
                ..HubConfig::default()
            },
        );
        let first = hub.start_attendance(ClassId::new("c1")).await.unwrap();

        let err = hub.start_attendance(ClassId::new("c2")).await.unwrap_err();

        assert!(matches!(
            err,
            RollcallError::Session(SessionError::AlreadyActive(_))
        ));
        assert_eq!(hub.sessions().get().await.unwrap().room_id, first.room_id);
        assert!(hub.store().active_room(&ClassId::new("c2")).await.is_none());
    }

    #[tokio::test]
    async fn test_start_attendance_replace_policy_discards_markings() {
        let hub = hub();
        start(&hub).await;
        hub.sessions()
            .mutate_attendance(|m| {
                m.insert(UserId::new("s1"), AttendanceStatus::Present);
            })
            .await
            .unwrap();

        start(&hub).await;

        assert!(hub.sessions().get().await.unwrap().attendance.is_empty());
    }

    // =====================================================================
    // disconnect
    // =====================================================================

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let hub = hub();
        join(&hub, 1, Identity::teacher("t1")).await;

        hub.disconnect(ConnectionId::new(1)).await;
        hub.disconnect(ConnectionId::new(1)).await;

        assert!(hub.registry().is_empty().await);
    }
}
