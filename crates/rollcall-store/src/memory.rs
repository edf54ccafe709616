//! An in-process store.
//!
//! Three maps, each behind its own `tokio::sync::RwLock`:
//!
//! - classes: roster and active room per class
//! - users: display name per user
//! - records: one status per `(class, student)`
//!
//! Seeding goes through the `with_*` builder methods (no lock needed, the
//! store is not shared yet). Failure injection and inspection methods
//! exist so tests can exercise the hub's error paths.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use rollcall_protocol::{AttendanceStatus, ClassId, UserId};
use tokio::sync::RwLock;

use crate::{
    AttendanceRecord, AttendanceStore, RoomMarker, RosterSource, StoreError,
    UserDirectory,
};

#[derive(Debug, Default)]
struct ClassEntry {
    roster: Vec<UserId>,
    active_room: Option<String>,
}

#[derive(Debug, Default)]
struct Faults {
    roster: bool,
    room_marker: bool,
    records: HashSet<UserId>,
    roster_delay: Option<Duration>,
    records_delay: Option<Duration>,
    directory_delay: Option<Duration>,
}

/// A [`ClassStore`](crate::ClassStore) held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    classes: RwLock<HashMap<ClassId, ClassEntry>>,
    users: RwLock<HashMap<UserId, String>>,
    records: RwLock<BTreeMap<(ClassId, UserId), AttendanceStatus>>,
    faults: RwLock<Faults>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a class with the given roster.
    pub fn with_class<I, U>(mut self, class: impl Into<String>, roster: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<String>,
    {
        self.classes.get_mut().insert(
            ClassId::new(class),
            ClassEntry {
                roster: roster.into_iter().map(UserId::new).collect(),
                active_room: None,
            },
        );
        self
    }

    /// Adds a user's display name.
    pub fn with_user(
        mut self,
        user: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.users.get_mut().insert(UserId::new(user), name.into());
        self
    }

    // -- Failure injection ------------------------------------------------

    /// Makes every roster fetch fail with `Unavailable`.
    pub async fn fail_roster(&self, fail: bool) {
        self.faults.write().await.roster = fail;
    }

    /// Makes `replace_record` fail for one student.
    pub async fn fail_record_for(&self, student: impl Into<String>) {
        self.faults
            .write()
            .await
            .records
            .insert(UserId::new(student));
    }

    /// Makes both room marker operations fail.
    pub async fn fail_room_marker(&self, fail: bool) {
        self.faults.write().await.room_marker = fail;
    }

    /// Delays every roster fetch.
    pub async fn delay_roster(&self, delay: Duration) {
        self.faults.write().await.roster_delay = Some(delay);
    }

    /// Delays every record write.
    pub async fn delay_records(&self, delay: Duration) {
        self.faults.write().await.records_delay = Some(delay);
    }

    /// Delays every display name lookup.
    pub async fn delay_directory(&self, delay: Duration) {
        self.faults.write().await.directory_delay = Some(delay);
    }

    // -- Inspection -------------------------------------------------------

    /// Every persisted record of `class`, by student.
    pub async fn records_for(
        &self,
        class: &ClassId,
    ) -> BTreeMap<UserId, AttendanceStatus> {
        self.records
            .read()
            .await
            .iter()
            .filter(|((c, _), _)| c == class)
            .map(|((_, student), status)| (student.clone(), *status))
            .collect()
    }

    /// The active room of `class`, if set.
    pub async fn active_room(&self, class: &ClassId) -> Option<String> {
        self.classes
            .read()
            .await
            .get(class)
            .and_then(|c| c.active_room.clone())
    }

    /// Ids of every known class, sorted.
    pub async fn class_ids(&self) -> Vec<ClassId> {
        let mut ids: Vec<ClassId> =
            self.classes.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl RosterSource for MemoryStore {
    async fn roster(&self, class: &ClassId) -> Result<Vec<UserId>, StoreError> {
        let (fail, delay) = {
            let faults = self.faults.read().await;
            (faults.roster, faults.roster_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(StoreError::Unavailable("roster fetch failed".into()));
        }

        self.classes
            .read()
            .await
            .get(class)
            .map(|c| c.roster.clone())
            .ok_or_else(|| StoreError::NotFound(format!("class {class}")))
    }
}

impl AttendanceStore for MemoryStore {
    async fn replace_record(
        &self,
        record: AttendanceRecord,
    ) -> Result<(), StoreError> {
        let (fail, delay) = {
            let faults = self.faults.read().await;
            (
                faults.records.contains(&record.student_id),
                faults.records_delay,
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(StoreError::Unavailable(format!(
                "write for {} failed",
                record.student_id
            )));
        }
        // One insert: the old record is replaced in the same step.
        self.records
            .write()
            .await
            .insert((record.class_id, record.student_id), record.status);
        Ok(())
    }
}

impl RoomMarker for MemoryStore {
    async fn set_active_room(
        &self,
        class: &ClassId,
        room_id: &str,
    ) -> Result<(), StoreError> {
        if self.faults.read().await.room_marker {
            return Err(StoreError::Unavailable("room marker failed".into()));
        }
        let mut classes = self.classes.write().await;
        let entry = classes
            .get_mut(class)
            .ok_or_else(|| StoreError::NotFound(format!("class {class}")))?;
        entry.active_room = Some(room_id.to_string());
        Ok(())
    }

    async fn clear_active_room(&self, class: &ClassId) -> Result<(), StoreError> {
        if self.faults.read().await.room_marker {
            return Err(StoreError::Unavailable("room marker failed".into()));
        }
        let mut classes = self.classes.write().await;
        let entry = classes
            .get_mut(class)
            .ok_or_else(|| StoreError::NotFound(format!("class {class}")))?;
        entry.active_room = None;
        Ok(())
    }
}

impl UserDirectory for MemoryStore {
    async fn display_name(&self, user: &UserId) -> Result<String, StoreError> {
        let delay = self.faults.read().await.directory_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.users
            .read()
            .await
            .get(user)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("user {user}")))
    }
}
