//! The connection registry: every live connection and its identity.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use rollcall_protocol::{Identity, UserId};
use rollcall_transport::{Connection, ConnectionId};
use tokio::sync::RwLock;

use crate::RegistryError;

/// Which connection receives a relay when one user has several open.
///
/// Fan-out to all of them is not an option: a signaling message always
/// reaches at most one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayPolicy {
    /// The user's oldest live connection.
    #[default]
    FirstConnected,
    /// The user's newest live connection.
    MostRecent,
}

/// A registry entry: the connection handle and the identity bound to it
/// at handshake time.
pub struct Registered<C> {
    pub conn: Arc<C>,
    pub identity: Identity,
}

impl<C: Connection> Registered<C> {
    /// The connection's id.
    pub fn id(&self) -> ConnectionId {
        self.conn.id()
    }
}

// Derive would require `C: Clone`; only the `Arc` is cloned.
impl<C> Clone for Registered<C> {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
            identity: self.identity.clone(),
        }
    }
}

impl<C> std::fmt::Debug for Registered<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registered")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

struct Entries<C> {
    /// Ordered by id, which is registration order.
    by_conn: BTreeMap<ConnectionId, Registered<C>>,
    /// Each user's connections, oldest first.
    by_user: HashMap<UserId, Vec<ConnectionId>>,
}

/// Tracks every live connection and the identity bound to it.
///
/// Writers (`register`, `unregister`) take the lock exclusively; readers
/// copy what they need out under a shared lock and release it before
/// doing any I/O.
pub struct ConnectionRegistry<C> {
    entries: RwLock<Entries<C>>,
    policy: RelayPolicy,
}

impl<C: Connection> ConnectionRegistry<C> {
    /// Creates an empty registry.
    pub fn new(policy: RelayPolicy) -> Self {
        Self {
            entries: RwLock::new(Entries {
                by_conn: BTreeMap::new(),
                by_user: HashMap::new(),
            }),
            policy,
        }
    }

    /// The relay target policy this registry was built with.
    pub fn policy(&self) -> RelayPolicy {
        self.policy
    }

    /// Adds a connection.
    ///
    /// # Errors
    /// [`RegistryError::AlreadyRegistered`] if the id is already present;
    /// the existing entry is left untouched.
    pub async fn register(
        &self,
        conn: Arc<C>,
        identity: Identity,
    ) -> Result<(), RegistryError> {
        let id = conn.id();
        let mut entries = self.entries.write().await;
        if entries.by_conn.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered(id));
        }

        entries
            .by_user
            .entry(identity.user_id.clone())
            .or_default()
            .push(id);
        tracing::debug!(conn_id = %id, user = %identity, "connection registered");
        entries.by_conn.insert(id, Registered { conn, identity });
        Ok(())
    }

    /// Removes a connection, returning its entry. Idempotent.
    pub async fn unregister(&self, id: ConnectionId) -> Option<Registered<C>> {
        let mut entries = self.entries.write().await;
        let removed = entries.by_conn.remove(&id)?;

        let user = &removed.identity.user_id;
        if let Some(ids) = entries.by_user.get_mut(user) {
            ids.retain(|c| *c != id);
            if ids.is_empty() {
                entries.by_user.remove(user);
            }
        }
        tracing::debug!(conn_id = %id, user = %removed.identity, "connection unregistered");
        Some(removed)
    }

    /// The identity bound to `id`, if it is registered.
    pub async fn lookup(&self, id: ConnectionId) -> Option<Identity> {
        self.entries
            .read()
            .await
            .by_conn
            .get(&id)
            .map(|e| e.identity.clone())
    }

    /// The full entry for `id`, if it is registered.
    pub async fn get(&self, id: ConnectionId) -> Option<Registered<C>> {
        self.entries.read().await.by_conn.get(&id).cloned()
    }

    /// A point-in-time copy of every entry, in registration order.
    pub async fn snapshot(&self) -> Vec<Registered<C>> {
        self.entries.read().await.by_conn.values().cloned().collect()
    }

    /// The connection a relay to `user` should go to, per the registry's
    /// [`RelayPolicy`].
    pub async fn find_user(&self, user: &UserId) -> Option<Registered<C>> {
        let entries = self.entries.read().await;
        let ids = entries.by_user.get(user)?;
        let id = match self.policy {
            RelayPolicy::FirstConnected => ids.first(),
            RelayPolicy::MostRecent => ids.last(),
        }?;
        entries.by_conn.get(id).cloned()
    }

    /// Every live connection of `user`, oldest first.
    pub async fn connections_of(&self, user: &UserId) -> Vec<ConnectionId> {
        self.entries
            .read()
            .await
            .by_user
            .get(user)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of registered connections.
    pub async fn len(&self) -> usize {
        self.entries.read().await.by_conn.len()
    }

    /// Returns `true` if nothing is registered.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.by_conn.is_empty()
    }
}

impl<C: Connection> Default for ConnectionRegistry<C> {
    fn default() -> Self {
        Self::new(RelayPolicy::default())
    }
}
