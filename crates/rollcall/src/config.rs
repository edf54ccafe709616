//! Hub configuration.

use std::time::Duration;

use rollcall_registry::RelayPolicy;
use rollcall_session::SessionConfig;

/// Tunables for a [`Hub`](crate::Hub) and the server around it.
///
/// Every persistence call the hub makes is bounded: a store that hangs
/// turns into a `StoreError::Timeout`, never into a stuck connection.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Bound on each roster fetch, record write, and room marker call.
    ///
    /// Default: 10 seconds.
    pub store_timeout: Duration,

    /// Bound on the display name lookup for `PEER_JOINED`. On timeout the
    /// name is `"Unknown"`.
    ///
    /// Default: 5 seconds.
    pub lookup_timeout: Duration,

    /// Bound on the WebSocket upgrade, token check included.
    ///
    /// Default: 5 seconds.
    pub handshake_timeout: Duration,

    /// Which connection receives a relay when the target user has several.
    pub relay_policy: RelayPolicy,

    /// Session store behavior.
    pub session: SessionConfig,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(10),
            lookup_timeout: Duration::from_secs(5),
            handshake_timeout: Duration::from_secs(5),
            relay_policy: RelayPolicy::FirstConnected,
            session: SessionConfig::default(),
        }
    }
}
