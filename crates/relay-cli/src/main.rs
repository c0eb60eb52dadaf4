//! CLI entry point - the composition root.
//!
//! A thin binary: parse arguments, initialize logging, build the
//! `RelayConfig`, supply the backend transport factory, and hand off to
//! `relay-web`'s server.

mod transport;

use clap::Parser;
use relay_web::{bootstrap::RelayConfig, start_server};
use std::sync::Arc;

/// Speech-to-speech conversational agent proxy.
#[derive(Parser, Debug)]
#[command(name = "s2s-relay", version, about)]
struct Args {
    /// Bind host.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Bind port.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Backend region.
    #[arg(long, env = "AWS_DEFAULT_REGION", default_value = "us-east-1")]
    region: String,

    /// Backend model id.
    #[arg(long, env = "MODEL_ID", default_value = "amazon.nova-2-sonic-v1:0")]
    model_id: String,

    /// Default voice id, overridden per connection by the `voice_id` query
    /// parameter.
    #[arg(long, env = "VOICE_ID", default_value = "matthew")]
    voice_id: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = RelayConfig {
        host: args.host,
        port: args.port,
        region: args.region,
        model_id: args.model_id,
        default_voice_id: args.voice_id,
    };

    tracing::info!(region = %config.region, model_id = %config.model_id, "starting s2s-relay");

    let transport_factory = Arc::new(transport::UnconfiguredBackendTransportFactory);
    start_server(config, transport_factory).await
}
