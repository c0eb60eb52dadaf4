//! Axum web adapter for `s2s-relay`: the Front-end Adapter (spec §4.7), the
//! HTTP health surface, and the composition root that wires a
//! [`relay_session::SessionManager`] per WebSocket connection.
//!
//! Grounded on `gglib-axum`'s bootstrap/state/routes/error split and its
//! `voice_ws.rs` ingest/egress task pairing — the one difference being that
//! this adapter's "audio device" is the backend inference transport rather
//! than a local microphone.

pub mod bootstrap;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use bootstrap::{start_server, AppContext, RelayConfig};
pub use error::HttpError;
pub use routes::create_router;
pub use state::AppState;
