//! The session store: the one place the in-progress session lives.
//!
//! Handlers never hold the session directly. Every operation takes the
//! lock exactly once:
//!
//! ```text
//!          start()             begin_finalize()
//!   Idle ───────────→ Active ──────────────────→ Finalizing
//!     ↑                 │ ↺ mutate_attendance()      │
//!     └─── clear() ─────┴──────── clear_if() ────────┘
//!
//!                                get() → snapshot (clone)
//! ```
//!
//! `mutate_attendance` runs the caller's closure under the write lock, so
//! concurrent markings from several teacher connections never lose an
//! update. Once finalization has snapshotted the mapping, the session is
//! read-only: late markings and a second finalization are refused rather
//! than accepted and lost. `get` hands out a clone: readers can take as
//! long as they like without blocking writers.

use rollcall_protocol::ClassId;
use tokio::sync::RwLock;

use crate::{AttendanceMap, RestartPolicy, Session, SessionConfig, SessionError};

/// Holds zero or one active attendance session.
#[derive(Debug, Default)]
pub struct SessionStore {
    current: RwLock<Option<Session>>,
    config: SessionConfig,
}

impl SessionStore {
    /// Creates an idle store.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            current: RwLock::new(None),
            config,
        }
    }

    /// Installs a new, empty session for `class_id` in room `room_id`.
    ///
    /// Returns a snapshot of the installed session.
    ///
    /// # Errors
    /// [`SessionError::AlreadyActive`] if a session is running and the
    /// store was configured with [`RestartPolicy::Reject`].
    pub async fn start(
        &self,
        class_id: ClassId,
        room_id: impl Into<String>,
    ) -> Result<Session, SessionError> {
        let mut current = self.current.write().await;

        if let Some(existing) = current.as_ref() {
            match self.config.restart {
                RestartPolicy::Reject => {
                    return Err(SessionError::AlreadyActive(
                        existing.class_id.clone(),
                    ));
                }
                RestartPolicy::Replace => {
                    tracing::warn!(
                        class = %existing.class_id,
                        marked = existing.attendance.len(),
                        "replacing active attendance session"
                    );
                }
            }
        }

        let session = Session::new(class_id, room_id);
        tracing::info!(
            class = %session.class_id,
            room = %session.room_id,
            "attendance session started"
        );
        *current = Some(session.clone());
        Ok(session)
    }

    /// Returns a snapshot of the active session, if any.
    pub async fn get(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    /// Returns `true` if a session is running.
    pub async fn is_active(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Runs `f` on the active session's mapping under the write lock.
    ///
    /// # Errors
    /// - [`SessionError::NoActiveSession`] when idle
    /// - [`SessionError::Finalizing`] once finalization has begun
    ///
    /// `f` is not called in either case.
    pub async fn mutate_attendance<R>(
        &self,
        f: impl FnOnce(&mut AttendanceMap) -> R,
    ) -> Result<R, SessionError> {
        let mut current = self.current.write().await;
        let session = current.as_mut().ok_or(SessionError::NoActiveSession)?;
        if session.finalizing {
            return Err(SessionError::Finalizing);
        }
        Ok(f(&mut session.attendance))
    }

    /// Applies the last change `f` to the session in room `room_id`, marks
    /// it as finalizing and returns `f`'s result with a snapshot.
    ///
    /// All of it happens under one write lock, so no marking can slip in
    /// between the change and the snapshot, and nothing can change the
    /// mapping afterwards.
    ///
    /// # Errors
    /// - [`SessionError::NoActiveSession`] if the active session is not
    ///   the one in `room_id` (or there is none)
    /// - [`SessionError::Finalizing`] if it is already being finalized
    pub async fn begin_finalize<R>(
        &self,
        room_id: &str,
        f: impl FnOnce(&mut AttendanceMap) -> R,
    ) -> Result<(R, Session), SessionError> {
        let mut current = self.current.write().await;
        let session = current
            .as_mut()
            .filter(|session| session.room_id == room_id)
            .ok_or(SessionError::NoActiveSession)?;
        if session.finalizing {
            return Err(SessionError::Finalizing);
        }

        let result = f(&mut session.attendance);
        session.finalizing = true;
        Ok((result, session.clone()))
    }

    /// Removes the active session, returning it. Idempotent.
    pub async fn clear(&self) -> Option<Session> {
        let cleared = self.current.write().await.take();
        if let Some(session) = &cleared {
            tracing::info!(class = %session.class_id, "attendance session cleared");
        }
        cleared
    }

    /// Removes the active session only if it is still the one in
    /// `expected` (same room). Returns whether it was removed.
    ///
    /// Finalization uses this so that a session started while the
    /// previous one was being persisted survives.
    pub async fn clear_if(&self, expected: &Session) -> bool {
        let mut current = self.current.write().await;
        match current.as_ref() {
            Some(active) if active.room_id == expected.room_id => {
                tracing::info!(class = %active.class_id, "attendance session cleared");
                *current = None;
                true
            }
            _ => false,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
