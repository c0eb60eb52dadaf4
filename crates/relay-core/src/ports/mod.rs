//! Port traits — the seams `relay-session` depends on as abstractions,
//! implemented by adapters elsewhere (or by test doubles in-crate).
//!
//! Grounded on `gglib-core::ports`'s trait-per-collaborator style
//! (`ProcessRunner`, `ModelRepository`, …), each a `#[async_trait]` so the
//! session manager can hold a `Arc<dyn Trait>` without committing to a
//! concrete transport, tool handler, or credentials sink.

mod backend_transport;
mod credential_sink;
mod tool_handler;

pub use backend_transport::{BackendTransport, BackendTransportFactory, TransportError};
pub use credential_sink::{CredentialSink, Credentials};
pub use tool_handler::ToolHandler;
