//! Domain types, wire event envelopes, and port traits shared by the
//! `s2s-relay` session manager and web adapter.
//!
//! This crate has no I/O of its own: it defines the shapes that cross the
//! session/backend boundary and the trait seams other crates implement.

pub mod domain;
pub mod events;
pub mod ports;

pub use domain::{
    AudioChunk, PendingTool, Session, SessionState, ToolUseRecord, INGRESS_QUEUE_CAPACITY,
    EGRESS_QUEUE_CAPACITY,
};
pub use events::{event_name, ContentType, EventBuilder, InferenceConfiguration, Role};
pub use ports::{
    BackendTransport, BackendTransportFactory, CredentialSink, Credentials, ToolHandler,
    TransportError,
};
