//! Inbound events: the envelope clients send and its typed interpretation.
//!
//! Every client frame is an [`Envelope`]: `{"event": "...", "data": {...}}`.
//! The `event` tag is parsed exactly once into the closed [`EventKind`]
//! enum; an unrecognized tag becomes [`ProtocolError::UnknownEvent`] and
//! never reaches a handler. Payload validation ([`Marking::from_data`],
//! [`Signal::from_data`]) is separate so the hub can check role and session
//! state first and only then look at the payload.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{AttendanceStatus, Identity, ProtocolError, ServerMessage, UserId};

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The message envelope used in both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// The event tag, e.g. `ATTENDANCE_MARKED`.
    pub event: String,

    /// Event-specific fields. Missing or `null` decodes as an empty map.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Map<String, Value>,
}

impl Envelope {
    /// Builds an envelope from a tag and a JSON object.
    ///
    /// Non-object `data` values are replaced by an empty map.
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        let data = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            event: event.into(),
            data,
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Map<String, Value>>::deserialize(deserializer)
        .map(Option::unwrap_or_default)
}

// ---------------------------------------------------------------------------
// EventKind
// ---------------------------------------------------------------------------

/// The three real-time signaling exchanges the hub relays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

impl SignalKind {
    /// The wire tag of this signal.
    pub fn event_name(self) -> &'static str {
        match self {
            Self::Offer => "WEBRTC_OFFER",
            Self::Answer => "WEBRTC_ANSWER",
            Self::IceCandidate => "WEBRTC_ICE_CANDIDATE",
        }
    }
}

/// Every event a client may send. Handlers match on this exhaustively, so
/// a new variant cannot be forgotten by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Teacher marks one student present/absent.
    AttendanceMarked,
    /// Teacher asks for the running counts.
    TodaySummary,
    /// Student asks for their own status.
    MyAttendance,
    /// Teacher closes the session.
    Done,
    /// Either role sends a point-to-point signaling message.
    Signal(SignalKind),
}

impl EventKind {
    /// Parses a wire tag.
    ///
    /// # Errors
    /// [`ProtocolError::UnknownEvent`] for any tag outside the event set.
    pub fn parse(tag: &str) -> Result<Self, ProtocolError> {
        match tag {
            "ATTENDANCE_MARKED" => Ok(Self::AttendanceMarked),
            "TODAY_SUMMARY" => Ok(Self::TodaySummary),
            "MY_ATTENDANCE" => Ok(Self::MyAttendance),
            "DONE" => Ok(Self::Done),
            "WEBRTC_OFFER" => Ok(Self::Signal(SignalKind::Offer)),
            "WEBRTC_ANSWER" => Ok(Self::Signal(SignalKind::Answer)),
            "WEBRTC_ICE_CANDIDATE" => {
                Ok(Self::Signal(SignalKind::IceCandidate))
            }
            other => Err(ProtocolError::UnknownEvent(other.to_string())),
        }
    }

    /// The wire tag of this event.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AttendanceMarked => "ATTENDANCE_MARKED",
            Self::TodaySummary => "TODAY_SUMMARY",
            Self::MyAttendance => "MY_ATTENDANCE",
            Self::Done => "DONE",
            Self::Signal(kind) => kind.event_name(),
        }
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// A validated `ATTENDANCE_MARKED` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marking {
    pub student_id: UserId,
    pub status: AttendanceStatus,
}

impl Marking {
    /// Validates `data.studentId` (non-empty string) and `data.status`
    /// (`present` or `absent`), in that order.
    pub fn from_data(data: &Map<String, Value>) -> Result<Self, ProtocolError> {
        let student_id = match data.get("studentId") {
            Some(Value::String(id)) if !id.is_empty() => UserId::new(id.as_str()),
            _ => return Err(ProtocolError::InvalidField("studentId")),
        };
        let status = data
            .get("status")
            .and_then(Value::as_str)
            .and_then(AttendanceStatus::parse)
            .ok_or(ProtocolError::InvalidField("status"))?;
        Ok(Self { student_id, status })
    }
}

/// A validated signaling message, ready to be relayed.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub kind: SignalKind,
    /// The user the message is addressed to.
    pub target: UserId,
    /// The full `data` object as the client sent it, `targetId` included.
    pub payload: Map<String, Value>,
}

impl Signal {
    /// Validates that `data.targetId` is a non-empty string.
    pub fn from_data(
        kind: SignalKind,
        data: Map<String, Value>,
    ) -> Result<Self, ProtocolError> {
        let target = match data.get("targetId") {
            Some(Value::String(id)) if !id.is_empty() => UserId::new(id.as_str()),
            _ => return Err(ProtocolError::MissingTarget),
        };
        Ok(Self {
            kind,
            target,
            payload: data,
        })
    }

    /// Stamps the sender's identity (`fromId`, `fromRole`) onto the payload
    /// and wraps it as the outbound message of the same kind. Any
    /// client-supplied `fromId`/`fromRole` is overwritten.
    pub fn into_relayed(self, from: &Identity) -> ServerMessage {
        let mut payload = self.payload;
        payload.insert(
            "fromId".to_string(),
            Value::String(from.user_id.to_string()),
        );
        payload.insert(
            "fromRole".to_string(),
            Value::String(from.role.as_str().to_string()),
        );
        match self.kind {
            SignalKind::Offer => ServerMessage::WebrtcOffer(payload),
            SignalKind::Answer => ServerMessage::WebrtcAnswer(payload),
            SignalKind::IceCandidate => {
                ServerMessage::WebrtcIceCandidate(payload)
            }
        }
    }
}
