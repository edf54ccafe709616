//! Session types: the data structures behind one attendance session.
//!
//! A "session" is the server's record of an attendance roll in progress:
//! - WHICH class it is for (`ClassId`)
//! - WHERE the live room is (`room_id`, also written to the class record)
//! - WHEN it began (`started_at`, UTC)
//! - WHO has been marked so far, and how (`attendance`)
//!
//! Students who have not been marked are simply missing from the map;
//! finalization fills them in as absent.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use rollcall_protocol::{AttendanceStatus, ClassId, UserId};

/// Student → recorded status. Ordered so snapshots and logs are stable.
pub type AttendanceMap = BTreeMap<UserId, AttendanceStatus>;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// What happens when a session is started while another one is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestartPolicy {
    /// Drop the running session (and its markings) and start fresh.
    #[default]
    Replace,
    /// Refuse with [`SessionError::AlreadyActive`](crate::SessionError::AlreadyActive).
    Reject,
}

/// Configuration for session behavior.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Behavior of `start` while a session is active.
    ///
    /// Default: [`RestartPolicy::Replace`].
    pub restart: RestartPolicy,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The single in-progress attendance session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Class the roll is being taken for.
    pub class_id: ClassId,

    /// Identifier of the live room, 32 lowercase hex characters.
    pub room_id: String,

    /// When the session was started.
    pub started_at: DateTime<Utc>,

    /// Markings received so far.
    pub attendance: AttendanceMap,

    /// Set once finalization has taken its snapshot. From then on the
    /// session is read-only until it is cleared.
    pub finalizing: bool,
}

impl Session {
    /// Creates an empty session started now.
    pub fn new(class_id: ClassId, room_id: impl Into<String>) -> Self {
        Self {
            class_id,
            room_id: room_id.into(),
            started_at: Utc::now(),
            attendance: AttendanceMap::new(),
            finalizing: false,
        }
    }

    /// The recorded status of `student`, if they have been marked.
    pub fn status_of(&self, student: &UserId) -> Option<AttendanceStatus> {
        self.attendance.get(student).copied()
    }

    /// Counts over the marked students only.
    pub fn summary(&self) -> AttendanceSummary {
        AttendanceSummary::of(&self.attendance)
    }
}

// ---------------------------------------------------------------------------
// AttendanceSummary
// ---------------------------------------------------------------------------

/// Present/absent counts. `total` is always `present + absent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttendanceSummary {
    pub present: usize,
    pub absent: usize,
    pub total: usize,
}

impl AttendanceSummary {
    /// Tallies a mapping.
    pub fn of(attendance: &AttendanceMap) -> Self {
        let present = attendance
            .values()
            .filter(|s| **s == AttendanceStatus::Present)
            .count();
        let absent = attendance.len() - present;
        Self {
            present,
            absent,
            total: attendance.len(),
        }
    }
}

/// Generates a random 32-character hex room identifier (128 bits).
pub fn generate_room_id() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
