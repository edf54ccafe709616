//! Error types for persistence collaborators.

use std::time::Duration;

/// Errors a store call can fail with.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The class or user does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The call did not finish within its time bound.
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
}
