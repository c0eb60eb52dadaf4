//! The backend bidirectional transport port (spec §9 design note).
//!
//! Treated as an object exposing `send`, `close`, and `receive` — any
//! underlying SDK (a raw bidirectional-streaming RPC client, or an agent
//! runtime's own transport) is expected to be wrapped to this shape by an
//! adapter outside this crate; the adapter itself is out of scope (spec §1:
//! "the remote inference transport itself" is a named external collaborator,
//! specified only at its interface).

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors a [`BackendTransport`] implementation may surface.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The stream could not be opened.
    #[error("backend stream open failed: {0}")]
    OpenFailed(String),

    /// A send on the input stream failed.
    #[error("backend send failed: {0}")]
    SendFailed(String),

    /// The backend reported a validation-class error on receive.
    #[error("backend validation error: {0}")]
    Validation(String),

    /// The backend stream ended cleanly (end of stream).
    #[error("backend stream ended")]
    EndOfStream,

    /// Any other receive-side failure, treated as fatal for the Egress
    /// Pump's loop (spec §4.3 termination table: "any other exception").
    #[error("backend receive failed: {0}")]
    ReceiveFailed(String),
}

/// A bidirectional, byte-framed connection to the remote inference backend.
///
/// One instance per [`relay_core::domain::Session`](crate::domain::Session).
/// Implementations must preserve receive-order: `receive()` calls return
/// inbound frames in the order the backend produced them (spec §5).
#[async_trait]
pub trait BackendTransport: Send + Sync {
    /// Send one already-JSON-encoded event envelope to the backend.
    async fn send(&self, envelope: &Value) -> Result<(), TransportError>;

    /// Receive the next inbound frame as raw bytes.
    ///
    /// JSON decoding happens in the Egress Pump (spec §4.3 step 2) so that a
    /// malformed frame can be turned into a `{raw_data: …}` record instead
    /// of tearing down the stream. Returns `Err(TransportError::EndOfStream)`
    /// when the backend closes the stream cleanly, and
    /// `Err(TransportError::Validation)` when the backend raises a
    /// validation-class fault on receive; any other `Err` is a fatal
    /// transport failure.
    async fn receive(&self) -> Result<Vec<u8>, TransportError>;

    /// Close the input side of the stream. Errors are logged, never
    /// propagated (spec §4.1: "Close the backend input stream (ignoring
    /// errors)").
    async fn close(&self);
}

/// Opens a new [`BackendTransport`] for a session.
///
/// Separated from `BackendTransport` itself because opening the stream
/// (`invoke_model_with_bidirectional_stream` in the Python reference) is a
/// distinct, fallible step from using an already-open stream — `initialize()`
/// calls this once; everything after talks to the returned transport.
#[async_trait]
pub trait BackendTransportFactory: Send + Sync {
    /// Open a bidirectional stream to `model_id` in `region`.
    async fn open(
        &self,
        region: &str,
        model_id: &str,
    ) -> Result<std::sync::Arc<dyn BackendTransport>, TransportError>;
}
