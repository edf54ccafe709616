//! Handshake gating: deciding whether an HTTP upgrade request may become
//! a WebSocket connection.
//!
//! The transport knows nothing about tokens or users. It hands the gate a
//! [`HandshakeRequest`] (path + decoded query parameters) and the gate
//! either admits the request, producing whatever the caller wants bound to
//! the connection, or rejects it with an HTTP status. A rejected request is
//! answered with that status and never upgraded.

use std::collections::HashMap;

/// The parts of an upgrade request a gate may inspect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandshakeRequest {
    path: String,
    query: HashMap<String, String>,
}

impl HandshakeRequest {
    /// Builds a request from a path and a raw (still percent-encoded)
    /// query string such as `token=abc&room=1`.
    ///
    /// Pairs that fail to decode are dropped. When a key repeats, the
    /// first occurrence wins.
    pub fn new(path: &str, raw_query: Option<&str>) -> Self {
        let mut query = HashMap::new();
        for pair in raw_query.unwrap_or("").split('&') {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let (Ok(key), Ok(value)) =
                (urlencoding::decode(key), urlencoding::decode(value))
            else {
                continue;
            };
            query
                .entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }
        Self {
            path: path.to_string(),
            query,
        }
    }

    /// The request path, e.g. `/ws`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Looks up a decoded query parameter.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }
}

/// A refusal to upgrade, sent back to the client as an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// HTTP status code of the response.
    pub status: u16,
    /// Human-readable body of the response.
    pub reason: String,
}

impl Rejection {
    /// A `401 Unauthorized` rejection.
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self {
            status: 401,
            reason: reason.into(),
        }
    }
}

/// Decides, synchronously and before the upgrade, whether a request is
/// admitted.
///
/// `Admitted` is what the gate hands back on success (for example the
/// authenticated identity). It travels with the upgraded connection.
pub trait HandshakeGate: Send + Sync + 'static {
    /// The value produced for an admitted request.
    type Admitted: Send + 'static;

    /// Admits or rejects an upgrade request.
    fn admit(
        &self,
        request: &HandshakeRequest,
    ) -> Result<Self::Admitted, Rejection>;
}
