//! Health endpoints (spec §6 CLI surface).
//!
//! Matches the Python reference's FastAPI handlers verbatim: `/ping` returns
//! `{"status": "ok"}`, `/health` returns `{"status": "healthy"}` — two
//! distinct literal strings, not the same body reused.

use axum::Json;
use serde_json::{json, Value};

/// `GET /ping`.
pub async fn ping() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// `GET /health`.
pub async fn health() -> Json<Value> {
    Json(json!({"status": "healthy"}))
}
