//! Collaborator traits.
//!
//! Each method returns `impl Future + Send` rather than being an
//! `async fn`: the hub calls these from spawned connection tasks, so the
//! futures must be `Send` even when the hub is generic over the store.

use std::future::Future;

use rollcall_protocol::{AttendanceStatus, ClassId, UserId};
use serde::{Deserialize, Serialize};

use crate::StoreError;

/// One persisted attendance record, unique per `(class_id, student_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub class_id: ClassId,
    pub student_id: UserId,
    pub status: AttendanceStatus,
}

/// Reads the roster of a class.
pub trait RosterSource: Send + Sync + 'static {
    /// The students enrolled in `class`, in enrollment order.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] for an unknown class,
    /// [`StoreError::Unavailable`] if the store cannot be reached.
    fn roster(
        &self,
        class: &ClassId,
    ) -> impl Future<Output = Result<Vec<UserId>, StoreError>> + Send;
}

/// Writes attendance records.
pub trait AttendanceStore: Send + Sync + 'static {
    /// Replaces any record for `(record.class_id, record.student_id)` with
    /// `record`, or inserts it if there is none.
    ///
    /// Implementations must make this a single atomic step: a failure
    /// leaves either the old record or the new one, never neither.
    fn replace_record(
        &self,
        record: AttendanceRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Maintains the "active room" pointer stored on each class.
pub trait RoomMarker: Send + Sync + 'static {
    /// Points `class` at the live room `room_id`.
    fn set_active_room(
        &self,
        class: &ClassId,
        room_id: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Clears the pointer. Callers treat failure as non-critical.
    fn clear_active_room(
        &self,
        class: &ClassId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Resolves user ids to display names.
pub trait UserDirectory: Send + Sync + 'static {
    /// The display name of `user`.
    fn display_name(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<String, StoreError>> + Send;
}

/// Everything the hub needs from persistence, as one bound.
pub trait ClassStore:
    RosterSource + AttendanceStore + RoomMarker + UserDirectory
{
}

impl<T> ClassStore for T where
    T: RosterSource + AttendanceStore + RoomMarker + UserDirectory
{
}
