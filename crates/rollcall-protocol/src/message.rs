//! Outbound messages: everything the hub ever writes to a client.
//!
//! `#[serde(tag = "event", content = "data")]` produces the same
//! `{"event": ..., "data": {...}}` envelope clients send, with event names
//! in SCREAMING_SNAKE_CASE and field names in camelCase:
//!
//! ```text
//! ServerMessage::AttendanceMarked { student_id, status }
//!   → {"event":"ATTENDANCE_MARKED","data":{"studentId":"s1","status":"present"}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{AttendanceStatus, Role, UserId};

/// A student's status as reported back to them: one of the two recorded
/// statuses, or "not yet updated" while they are still unmarked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkState {
    Present,
    Absent,
    #[serde(rename = "not yet updated")]
    NotYetUpdated,
}

impl From<Option<AttendanceStatus>> for MarkState {
    fn from(status: Option<AttendanceStatus>) -> Self {
        match status {
            Some(AttendanceStatus::Present) => Self::Present,
            Some(AttendanceStatus::Absent) => Self::Absent,
            None => Self::NotYetUpdated,
        }
    }
}

/// Every server-to-client message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// Broadcast: a teacher marked a student.
    AttendanceMarked {
        student_id: UserId,
        status: AttendanceStatus,
    },

    /// Broadcast: running counts over the marked students.
    TodaySummary {
        present: usize,
        absent: usize,
        total: usize,
    },

    /// Unicast: the requesting student's own status.
    MyAttendance { status: MarkState },

    /// Broadcast: the session was finalized and persisted.
    Done {
        message: String,
        present: usize,
        absent: usize,
        total: usize,
    },

    /// Broadcast to everyone but the newcomer: a participant connected.
    PeerJoined {
        user_id: UserId,
        role: Role,
        name: String,
    },

    /// Unicast relay: the client's payload plus `fromId`/`fromRole`.
    WebrtcOffer(Map<String, Value>),

    /// Unicast relay, see [`ServerMessage::WebrtcOffer`].
    WebrtcAnswer(Map<String, Value>),

    /// Unicast relay, see [`ServerMessage::WebrtcOffer`].
    WebrtcIceCandidate(Map<String, Value>),

    /// Unicast to the sender: the request was refused.
    Error { message: String },
}

impl ServerMessage {
    /// Builds an `ERROR` message.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// The wire tag of this message.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::AttendanceMarked { .. } => "ATTENDANCE_MARKED",
            Self::TodaySummary { .. } => "TODAY_SUMMARY",
            Self::MyAttendance { .. } => "MY_ATTENDANCE",
            Self::Done { .. } => "DONE",
            Self::PeerJoined { .. } => "PEER_JOINED",
            Self::WebrtcOffer(_) => "WEBRTC_OFFER",
            Self::WebrtcAnswer(_) => "WEBRTC_ANSWER",
            Self::WebrtcIceCandidate(_) => "WEBRTC_ICE_CANDIDATE",
            Self::Error { .. } => "ERROR",
        }
    }
}
