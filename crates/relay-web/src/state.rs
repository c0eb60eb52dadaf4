//! Shared application state type.
//!
//! Grounded on `gglib-axum/src/state.rs`: a plain `Arc<AppContext>` alias so
//! every handler's `State<AppState>` extractor is a cheap clone.

use crate::bootstrap::AppContext;
use std::sync::Arc;

/// Application state shared across all handlers.
pub type AppState = Arc<AppContext>;
