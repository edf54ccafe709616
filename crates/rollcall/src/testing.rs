//! A socket-free connection for hub unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use rollcall_transport::{Connection, ConnectionId};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
#[error("test connection write failed")]
pub struct TestConnectionError;

/// Records every frame written to it, decoded as JSON.
pub struct TestConnection {
    id: ConnectionId,
    sent: Mutex<Vec<Value>>,
    fail_sends: AtomicBool,
}

impl TestConnection {
    pub fn new(id: u64) -> Self {
        Self {
            id: ConnectionId::new(id),
            sent: Mutex::new(Vec::new()),
            fail_sends: AtomicBool::new(false),
        }
    }

    pub fn frames(&self) -> Vec<Value> {
        self.sent.lock().unwrap().clone()
    }

    /// The message of the most recent frame, if it was an `ERROR`.
    pub fn last_error(&self) -> Option<String> {
        let frames = self.sent.lock().unwrap();
        let last = frames.last()?;
        if last["event"] != "ERROR" {
            return None;
        }
        last["data"]["message"].as_str().map(str::to_string)
    }

    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }
}

impl Connection for TestConnection {
    type Error = TestConnectionError;

    async fn send(&self, data: &[u8]) -> Result<(), TestConnectionError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TestConnectionError);
        }
        let value = serde_json::from_slice(data).map_err(|_| TestConnectionError)?;
        self.sent.lock().unwrap().push(value);
        Ok(())
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TestConnectionError> {
        Ok(None)
    }

    async fn close(&self) -> Result<(), TestConnectionError> {
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

/// Encodes a client frame.
pub fn frame(event: &str, data: Value) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({"event": event, "data": data})).unwrap()
}
