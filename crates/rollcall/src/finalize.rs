//! Finalization: turning the in-memory roll into persisted records.
//!
//! Runs inside the `DONE` handler of the teacher connection that sent it:
//!
//! ```text
//! 1. fetch roster            (failure: ERROR to teacher, session kept)
//! 2. default unmarked → absent and freeze the session
//! 3. clear the class's active room   (best effort)
//! 4. snapshot, taken under the same lock as 2
//! 5. replace one record per student  (failures logged and skipped)
//! 6. count present / absent / total
//! 7. broadcast DONE
//! 8. clear the session
//! ```
//!
//! From step 2 until the session is cleared, markings and a second `DONE`
//! are refused with `Attendance session is being finalized`. Every store
//! call is bounded by `HubConfig::store_timeout`. Records already written
//! are never rolled back.

use std::collections::HashSet;

use rollcall_protocol::{AttendanceStatus, ServerMessage};
use rollcall_session::Session;
use rollcall_store::{AttendanceRecord, ClassStore};
use rollcall_transport::Connection;

use crate::hub::bounded;
use crate::{Hub, RollcallError};

/// Status given to roster students the teacher never marked.
const UNMARKED_DEFAULT: AttendanceStatus = AttendanceStatus::Absent;

/// Text of the `DONE` message.
pub const DONE_MESSAGE: &str = "Attendance persisted";

impl<C: Connection, S: ClassStore> Hub<C, S> {
    /// Finalizes `session`: persists every roster student's status,
    /// broadcasts the counts, and clears the session.
    ///
    /// # Errors
    /// - [`RollcallError::RosterUnavailable`] if the roster could not be
    ///   read. Nothing has changed at that point and the teacher may retry.
    /// - `SessionError::Finalizing` if another finalization of the same
    ///   session got there first.
    /// - `SessionError::NoActiveSession` if `session` has since been
    ///   replaced or cleared.
    pub async fn finalize(&self, session: Session) -> Result<(), RollcallError> {
        let class_id = session.class_id.clone();
        let limit = self.config().store_timeout;

        // 1. Roster.
        let roster = bounded(limit, self.store().roster(&class_id))
            .await
            .map_err(|e| {
                tracing::warn!(class = %class_id, error = %e, "roster fetch failed");
                RollcallError::RosterUnavailable(e)
            })?;

        // 2. Default the unmarked and freeze. Teacher marks are never
        //    overwritten.
        let (defaulted, snapshot) = self
            .sessions()
            .begin_finalize(&session.room_id, |attendance| {
                let mut defaulted = 0usize;
                for student in &roster {
                    if !attendance.contains_key(student) {
                        attendance.insert(student.clone(), UNMARKED_DEFAULT);
                        defaulted += 1;
                    }
                }
                defaulted
            })
            .await?;

        // 3. Best effort.
        if let Err(e) = bounded(limit, self.store().clear_active_room(&class_id)).await {
            tracing::debug!(class = %class_id, error = %e, "clearing active room failed");
        }

        // 5. Persist, one student at a time.
        let mut failed = 0usize;
        for (student, status) in &snapshot.attendance {
            let record = AttendanceRecord {
                class_id: class_id.clone(),
                student_id: student.clone(),
                status: *status,
            };
            if let Err(e) = bounded(limit, self.store().replace_record(record)).await {
                failed += 1;
                tracing::warn!(
                    class = %class_id,
                    %student,
                    error = %e,
                    "skipping attendance record"
                );
            }
        }

        // 6. Counts.
        let summary = snapshot.summary();

        // 7. Everyone hears about it.
        let message = ServerMessage::Done {
            message: DONE_MESSAGE.to_string(),
            present: summary.present,
            absent: summary.absent,
            total: summary.total,
        };
        let sent = self
            .registry()
            .broadcast(self.codec(), &message, &HashSet::new())
            .await;

        // 8. Only the session that was finalized; a newer one survives.
        //    Cleared even if the broadcast failed, so it cannot stay frozen.
        self.sessions().clear_if(&snapshot).await;
        sent?;

        tracing::info!(
            class = %class_id,
            present = summary.present,
            absent = summary.absent,
            total = summary.total,
            defaulted,
            failed,
            "attendance finalized"
        );
        Ok(())
    }
}
