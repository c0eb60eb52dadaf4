//! `relay-session` error type.

use thiserror::Error;

/// Errors surfaced by [`crate::SessionManager`].
///
/// Per spec §7's propagation principle, only [`SessionError::BackendInit`]
/// is meant to escape `initialize()` to its caller — every other failure
/// inside a running session is logged or turned into a client-visible
/// `error` envelope instead.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The backend stream could not be opened; the session is left in
    /// `Closed`.
    #[error("failed to initialize backend stream: {0}")]
    BackendInit(String),
}
