//! A socket-free [`Connection`] for unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use rollcall_transport::{Connection, ConnectionId};

#[derive(Debug, thiserror::Error)]
#[error("mock connection write failed")]
pub struct MockError;

/// Records every frame it is sent; can be told to fail writes.
pub struct MockConnection {
    id: ConnectionId,
    sent: Mutex<Vec<Vec<u8>>>,
    fail_sends: AtomicBool,
    closed: AtomicBool,
}

impl MockConnection {
    pub fn new(id: u64) -> Self {
        Self {
            id: ConnectionId::new(id),
            sent: Mutex::new(Vec::new()),
            fail_sends: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// A connection whose every write fails.
    pub fn failing(id: u64) -> Self {
        let conn = Self::new(id);
        conn.fail_sends.store(true, Ordering::SeqCst);
        conn
    }

    /// Frames written so far, decoded as JSON.
    pub fn sent_json(&self) -> Vec<serde_json::Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|bytes| serde_json::from_slice(bytes).unwrap())
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Connection for MockConnection {
    type Error = MockError;

    async fn send(&self, data: &[u8]) -> Result<(), MockError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(MockError);
        }
        self.sent.lock().unwrap().push(data.to_vec());
        Ok(())
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, MockError> {
        Ok(None)
    }

    async fn close(&self) -> Result<(), MockError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
