//! The composition-root seam for the remote inference transport.
//!
//! The bidirectional backend stream itself is named in spec §1 as an
//! external collaborator specified only at its interface — this binary does
//! not carry a concrete AWS (or any other) adapter. `UnconfiguredBackendTransportFactory`
//! fails loudly on `open()` so the rest of the stack (session lifecycle,
//! pumps, tool dispatch, the WS front end) is exercisable end to end against
//! a real adapter dropped in here later, the same way `relay-session`'s own
//! tests exercise it against a fake.

use std::sync::Arc;

use async_trait::async_trait;
use relay_core::{BackendTransport, BackendTransportFactory, TransportError};

/// Placeholder factory: always reports `OpenFailed`. Replace with a real
/// adapter over the backend's bidirectional-streaming API to make sessions
/// actually reach the remote model.
pub struct UnconfiguredBackendTransportFactory;

#[async_trait]
impl BackendTransportFactory for UnconfiguredBackendTransportFactory {
    async fn open(
        &self,
        region: &str,
        model_id: &str,
    ) -> Result<Arc<dyn BackendTransport>, TransportError> {
        Err(TransportError::OpenFailed(format!(
            "no backend transport adapter configured for region {region} model {model_id}"
        )))
    }
}
