//! The hub's narrow view of the persistent store.
//!
//! The hub never talks to a database directly. It sees four small
//! collaborator traits, one per thing it needs:
//!
//! | trait | used for |
//! |---|---|
//! | [`RosterSource`] | the students enrolled in a class (finalization) |
//! | [`AttendanceStore`] | writing one attendance record (finalization) |
//! | [`RoomMarker`] | setting/clearing a class's active room |
//! | [`UserDirectory`] | display names for `PEER_JOINED` |
//!
//! [`ClassStore`] is implemented for anything that implements all four,
//! so the hub takes a single type parameter. [`MemoryStore`] is the
//! in-process implementation used by the demo server and the tests.

mod error;
mod memory;
mod traits;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use traits::{
    AttendanceRecord, AttendanceStore, ClassStore, RoomMarker, RosterSource,
    UserDirectory,
};
