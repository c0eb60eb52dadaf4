//! Axum-specific error type and its `IntoResponse` mapping.
//!
//! Grounded on `gglib-axum/src/error.rs`'s `HttpError` + `IntoResponse`
//! pattern, trimmed to the handful of variants this adapter's surface
//! actually produces (spec §7: almost every runtime error is either logged
//! or turned into a client-visible WebSocket `error` envelope rather than an
//! HTTP response — this type only covers the few things that can fail before
//! a session exists).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Axum-adapter error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The backend stream could not be opened for a new WebSocket session
    /// (spec §7 `BackendInitError`). Produced by the `/ws` upgrade handler's
    /// preflight `open_transport()` call, run *before* `ws.on_upgrade()` so
    /// a failed backend can still be answered with a rejected HTTP upgrade
    /// instead of a socket that opens and then silently closes.
    #[error("backend unavailable: {0}")]
    ServiceUnavailable(String),

    /// Any other adapter-level failure.
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    status: u16,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            HttpError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            HttpError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };
        let body = ErrorBody {
            error: message,
            status: status.as_u16(),
        };
        (status, axum::Json(body)).into_response()
    }
}

impl From<relay_session::SessionError> for HttpError {
    fn from(err: relay_session::SessionError) -> Self {
        match err {
            relay_session::SessionError::BackendInit(msg) => HttpError::ServiceUnavailable(msg),
        }
    }
}
