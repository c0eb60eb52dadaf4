//! Composition root: wires a [`relay_session::SessionManager`] factory, the
//! bundled tool registry, and the process-wide credential refresher behind
//! one `AppContext`, then starts the Axum server.
//!
//! Grounded on `gglib-axum/src/bootstrap.rs`'s `ServerConfig` + `bootstrap()`
//! + `start_server()` split. The one collaborator this module does not
//! construct is the [`relay_core::BackendTransportFactory`] itself — spec §1
//! names "the remote inference transport itself" as an external
//! collaborator specified only at its interface, so the concrete adapter is
//! supplied by the caller (`relay-cli`'s own composition root) rather than
//! built here.

use std::sync::Arc;

use anyhow::Result;
use relay_core::BackendTransportFactory;
use relay_session::{CredentialRefresher, EnvCredentialSink, ToolRegistry};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Server configuration for the Axum adapter (spec §6 CLI surface, §3
/// ambient configuration).
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Bind host, default `0.0.0.0` (spec §6).
    pub host: String,
    /// Bind port, default `8080` (spec §6).
    pub port: u16,
    /// Backend region, default `us-east-1` (spec §6, `AWS_DEFAULT_REGION`).
    pub region: String,
    /// Backend model id passed to every session's `initialize()`.
    pub model_id: String,
    /// Default voice id, overridden per connection by the `voice_id` query
    /// parameter (spec §6).
    pub default_voice_id: String,
}

impl RelayConfig {
    /// Read configuration from the process environment, falling back to the
    /// spec's documented defaults for anything unset.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(8080),
            region: std::env::var("AWS_DEFAULT_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            model_id: std::env::var("MODEL_ID")
                .unwrap_or_else(|_| "amazon.nova-2-sonic-v1:0".to_string()),
            default_voice_id: std::env::var("VOICE_ID")
                .unwrap_or_else(|_| relay_core::events::DEFAULT_VOICE_ID.to_string()),
        }
    }
}

/// Application context shared across every handler: the per-connection
/// `SessionManager` factory inputs plus the process-wide singletons.
pub struct AppContext {
    pub config: RelayConfig,
    pub transport_factory: Arc<dyn BackendTransportFactory>,
    pub tools: Arc<ToolRegistry>,
    pub credential_refresher: Arc<CredentialRefresher>,
}

/// Build the shared `AppContext`, starting the credential refresher (spec
/// §4.6) unless ambient static credentials are already present.
pub async fn bootstrap(
    config: RelayConfig,
    transport_factory: Arc<dyn BackendTransportFactory>,
) -> Arc<AppContext> {
    let credential_refresher = CredentialRefresher::new();
    credential_refresher
        .start(Arc::new(EnvCredentialSink))
        .await;

    Arc::new(AppContext {
        config,
        transport_factory,
        tools: Arc::new(ToolRegistry::with_default_tools()),
        credential_refresher,
    })
}

/// Build the app context and serve the router until the process is
/// terminated.
pub async fn start_server(
    config: RelayConfig,
    transport_factory: Arc<dyn BackendTransportFactory>,
) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let ctx = bootstrap(config, transport_factory).await;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = crate::routes::create_router(ctx).layer(cors);

    let listener = TcpListener::bind(&addr).await?;
    info!(address = %addr, "s2s-relay listening");
    axum::serve(listener, app).await?;
    Ok(())
}
