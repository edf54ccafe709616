//! Bridges an [`Authenticator`] into the transport's handshake gate.
//!
//! The bearer token travels as the `token` query parameter of the upgrade
//! request. A missing token and a rejected token both answer `401`; the
//! socket is never upgraded and no connection is registered.

use rollcall_protocol::Identity;
use rollcall_session::Authenticator;
use rollcall_transport::{HandshakeGate, HandshakeRequest, Rejection};

/// Query parameter carrying the bearer token.
pub const TOKEN_PARAM: &str = "token";

/// A [`HandshakeGate`] admitting requests whose token the wrapped
/// [`Authenticator`] accepts. Admitted connections carry the resolved
/// [`Identity`].
pub struct AuthGate<A> {
    auth: A,
}

impl<A: Authenticator> AuthGate<A> {
    pub fn new(auth: A) -> Self {
        Self { auth }
    }
}

impl<A: Authenticator> HandshakeGate for AuthGate<A> {
    type Admitted = Identity;

    fn admit(&self, request: &HandshakeRequest) -> Result<Identity, Rejection> {
        let token = request
            .query(TOKEN_PARAM)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Rejection::unauthorized("token missing"))?;

        self.auth.authenticate(token).map_err(|e| {
            tracing::debug!(error = %e, "handshake token rejected");
            Rejection::unauthorized("invalid token")
        })
    }
}
