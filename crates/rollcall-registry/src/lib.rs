//! Who is connected, and how to reach them.
//!
//! This crate owns the connection → identity mapping and the two ways of
//! writing to it:
//!
//! - [`ConnectionRegistry`]: register/unregister/lookup/snapshot, plus a
//!   secondary index from user to connections
//! - [`ConnectionRegistry::broadcast`]: continue-on-error fan-out to every
//!   connection outside an exclude set
//! - [`ConnectionRegistry::relay`]: point-to-point delivery of a
//!   signaling message to exactly one connection of the target user
//!
//! Every write happens against a snapshot taken under a brief read lock;
//! no lock is held while a socket is written to. A failed write is treated
//! as a disconnect: the connection is closed and unregistered, and nobody
//! else notices.

mod error;
mod fanout;
mod registry;

#[cfg(test)]
mod mock;

pub use error::RegistryError;
pub use fanout::FanoutReport;
pub use registry::{ConnectionRegistry, Registered, RelayPolicy};
