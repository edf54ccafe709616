//! Authentication hook for resolving a connection's identity.
//!
//! Rollcall doesn't verify tokens itself. Signature checks, expiry, and
//! user lookup belong to whatever identity provider the deployment uses.
//! The [`Authenticator`] trait is the seam: it takes the bearer token from
//! the upgrade request and returns an [`Identity`] (user id plus role) or
//! an error.
//!
//! # Why synchronous?
//!
//! The verdict is needed *inside* the HTTP upgrade callback, so the
//! server can answer `401` before the socket is ever switched to
//! WebSocket. That callback is a plain function, so validation must be
//! too: a local signature check, not a network round trip.

use std::collections::HashMap;

use rollcall_protocol::Identity;

use crate::SessionError;

/// Validates a bearer token and returns the caller's identity.
///
/// # Example
///
/// ```rust
/// use rollcall_protocol::{Identity, Role};
/// use rollcall_session::{Authenticator, SessionError};
///
/// /// Accepts `role:user` tokens verbatim. Development only.
/// struct DevAuthenticator;
///
/// impl Authenticator for DevAuthenticator {
///     fn authenticate(&self, token: &str) -> Result<Identity, SessionError> {
///         let (role, user) = token.split_once(':').ok_or_else(|| {
///             SessionError::AuthFailed("expected role:user".into())
///         })?;
///         let role: Role = role
///             .parse()
///             .map_err(|_| SessionError::AuthFailed("unknown role".into()))?;
///         Ok(Identity::new(user, role))
///     }
/// }
///
/// let id = DevAuthenticator.authenticate("teacher:t1").unwrap();
/// assert_eq!(id, Identity::teacher("t1"));
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Validates `token` and returns who it belongs to.
    ///
    /// # Errors
    /// [`SessionError::AuthFailed`] if the token is malformed, expired, or
    /// otherwise rejected.
    fn authenticate(&self, token: &str) -> Result<Identity, SessionError>;
}

/// A fixed token → identity table.
///
/// Handy for demos and tests; a real deployment verifies signed tokens.
#[derive(Debug, Clone, Default)]
pub struct StaticTokens {
    tokens: HashMap<String, Identity>,
}

impl StaticTokens {
    /// Creates an empty table. Every token is rejected until one is added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a token, builder style.
    pub fn with(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.insert(token, identity);
        self
    }

    /// Adds or replaces a token.
    pub fn insert(&mut self, token: impl Into<String>, identity: Identity) {
        self.tokens.insert(token.into(), identity);
    }

    /// Number of known tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns `true` if no token is known.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Authenticator for StaticTokens {
    fn authenticate(&self, token: &str) -> Result<Identity, SessionError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| SessionError::AuthFailed("unknown token".into()))
    }
}
