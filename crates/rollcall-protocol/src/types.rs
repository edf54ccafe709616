//! Identity and status types shared by every layer.
//!
//! These are "newtype wrappers" around strings: a `UserId` and a `ClassId`
//! are both strings underneath, but the compiler will not let you pass one
//! where the other is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Identifier of a user (teacher or student), as issued by the identity
/// provider.
///
/// `#[serde(transparent)]` serializes it as the bare string, so
/// `UserId("s1")` is `"s1"` on the wire.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Creates a user identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identifier of a class (the roster an attendance session is taken for).
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ClassId(pub String);

impl ClassId {
    /// Creates a class identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClassId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// ---------------------------------------------------------------------------
// Role / Identity
// ---------------------------------------------------------------------------

/// What a connected user is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Marks attendance, asks for summaries, finalizes the session.
    Teacher,
    /// Asks for their own status.
    Student,
}

impl Role {
    /// The wire name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Teacher => "teacher",
            Self::Student => "student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "teacher" => Ok(Self::Teacher),
            "student" => Ok(Self::Student),
            other => Err(ProtocolError::InvalidMessage(format!(
                "unknown role {other:?}"
            ))),
        }
    }
}

/// Who is on the other end of a connection. Bound once at handshake time
/// and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// The user's identifier.
    pub user_id: UserId,
    /// The user's role.
    pub role: Role,
}

impl Identity {
    /// Creates an identity.
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: UserId::new(user_id),
            role,
        }
    }

    /// Shorthand for a teacher identity.
    pub fn teacher(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Role::Teacher)
    }

    /// Shorthand for a student identity.
    pub fn student(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Role::Student)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.user_id, self.role)
    }
}

// ---------------------------------------------------------------------------
// AttendanceStatus
// ---------------------------------------------------------------------------

/// The only two values an attendance mapping may hold.
///
/// "Not marked yet" is deliberately not a variant: an unmarked student is
/// simply absent from the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    /// Parses a wire value; anything other than `present`/`absent` is
    /// rejected.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "present" => Some(Self::Present),
            "absent" => Some(Self::Absent),
            _ => None,
        }
    }

    /// The wire name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&UserId::new("s1")).unwrap();
        assert_eq!(json, "\"s1\"");
    }

    #[test]
    fn test_class_id_display_is_raw_id() {
        assert_eq!(ClassId::new("c-42").to_string(), "c-42");
    }

    #[test]
    fn test_role_round_trips_through_lowercase() {
        let json = serde_json::to_string(&Role::Teacher).unwrap();
        assert_eq!(json, "\"teacher\"");
        assert_eq!("student".parse::<Role>().unwrap(), Role::Student);
    }

    #[test]
    fn test_role_from_str_unknown_is_error() {
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_identity_display_names_role() {
        assert_eq!(Identity::teacher("t1").to_string(), "t1 (teacher)");
    }

    #[test]
    fn test_attendance_status_parse_only_accepts_two_values() {
        assert_eq!(
            AttendanceStatus::parse("present"),
            Some(AttendanceStatus::Present)
        );
        assert_eq!(
            AttendanceStatus::parse("absent"),
            Some(AttendanceStatus::Absent)
        );
        assert_eq!(AttendanceStatus::parse("late"), None);
        assert_eq!(AttendanceStatus::parse("Present"), None);
    }
}
