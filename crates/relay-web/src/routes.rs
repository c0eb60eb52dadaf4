//! Route definitions and router construction.
//!
//! Grounded on `gglib-axum/src/routes.rs`'s `create_router` shape, trimmed to
//! this adapter's three endpoints (spec §6 CLI surface).

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the Axum router: `GET /ping`, `GET /health`, `GET /ws`.
#[must_use]
pub fn create_router(ctx: AppState) -> Router {
    Router::new()
        .route("/ping", get(handlers::health::ping))
        .route("/health", get(handlers::health::health))
        .route("/ws", get(handlers::ws::upgrade))
        .with_state(ctx)
}
