//! The Front-end Adapter (spec §4.7): the `GET /ws` WebSocket upgrade
//! handler.
//!
//! Grounded on `gglib-axum/src/handlers/voice_ws.rs`'s ingest/egress
//! task-pair-joined-by-`select!` shape, and on `server.py`'s
//! `websocket_endpoint`/`handle_websocket_input` for the text-vs-audio
//! routing logic and the `voice_id` query parameter default.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use relay_core::{event_name, BackendTransport, EventBuilder};
use relay_session::SessionManager;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::HttpError;
use crate::state::AppState;

/// `GET /ws?voice_id=...` — upgrade to a WebSocket-backed session (spec §6).
///
/// Opens the backend stream *before* accepting the upgrade: `initialize()`'s
/// fallible half (`open_transport()`) runs here, so a backend that can't be
/// reached is answered with a rejected HTTP upgrade (`HttpError::ServiceUnavailable`)
/// rather than a socket that opens and then immediately closes.
pub async fn upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, HttpError> {
    let voice_id = params
        .get("voice_id")
        .cloned()
        .unwrap_or_else(|| state.config.default_voice_id.clone());

    let manager = SessionManager::new(
        state.config.region.clone(),
        state.config.model_id.clone(),
        Arc::clone(&state.transport_factory),
        Arc::clone(&state.tools),
    );
    let transport = manager.open_transport().await?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, manager, transport, voice_id)))
}

async fn handle_socket(
    socket: WebSocket,
    manager: Arc<SessionManager>,
    transport: Arc<dyn BackendTransport>,
    voice_id: String,
) {
    manager.start(transport).await;
    info!(voice_id = %voice_id, "session opened");

    let (mut ws_sink, mut ws_stream) = socket.split();

    let egress_manager = Arc::clone(&manager);
    let mut egress = tokio::spawn(async move {
        while let Some(event) = egress_manager.recv_egress().await {
            if ws_sink.send(Message::Text(event.to_string())).await.is_err() {
                break;
            }
        }
    });

    let ingress_manager = Arc::clone(&manager);
    let mut ingress = tokio::spawn(async move {
        while let Some(message) = ws_stream.next().await {
            match message {
                Ok(Message::Text(text)) => handle_client_message(&ingress_manager, &text).await,
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    });

    // Whichever side observes the disconnect first tears down the other,
    // mirroring the teacher's audio WS handler's select! over its ingest and
    // egress tasks.
    tokio::select! {
        _ = &mut egress => { ingress.abort(); }
        _ = &mut ingress => { egress.abort(); }
    }

    manager.close().await;
    info!("session closed");
}

/// Route one inbound client message: `type: "text_input"` goes straight to
/// the backend as a `textInput` event (spec §4.7); anything else is either
/// an `audioInput` envelope (routed through the bounded ingress queue) or
/// another raw wire envelope the client manages directly (`promptStart`,
/// `contentStart`, `contentEnd`, `promptEnd`, `sessionEnd`, …), forwarded
/// verbatim.
async fn handle_client_message(manager: &Arc<SessionManager>, text: &str) {
    let Ok(value) = serde_json::from_str::<Value>(text) else {
        warn!("received non-JSON client message, dropping");
        return;
    };

    if value.get("type").and_then(Value::as_str) == Some("text_input") {
        send_text_input(manager, &value).await;
        return;
    }

    route_raw_envelope(manager, value).await;
}

async fn send_text_input(manager: &Arc<SessionManager>, value: &Value) {
    let content = value.get("text").and_then(Value::as_str).unwrap_or_default();
    let snapshot = manager.snapshot();
    let prompt_name = value
        .get("promptName")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or(snapshot.prompt_name)
        .unwrap_or_default();
    let content_name = value
        .get("contentName")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or(snapshot.content_name)
        .unwrap_or_default();

    info!(prompt = %prompt_name, "received text input");
    manager
        .send_event(EventBuilder::text_input(&prompt_name, &content_name, content))
        .await;
}

async fn route_raw_envelope(manager: &Arc<SessionManager>, value: Value) {
    let Some(name) = event_name(&value).map(str::to_string) else {
        warn!("unrecognized client message shape, dropping");
        return;
    };

    match name.as_str() {
        "audioInput" => route_audio_input(manager, &value),
        "promptStart" => {
            if let Some(prompt_name) = value["event"]["promptStart"]["promptName"].as_str() {
                manager.set_prompt_name(prompt_name);
            }
            manager.send_event(value).await;
        }
        "contentStart" => {
            let body = &value["event"]["contentStart"];
            if let Some(content_name) = body["contentName"].as_str() {
                if body["type"].as_str() == Some("AUDIO") {
                    manager.set_audio_content_name(content_name);
                } else {
                    manager.set_content_name(content_name);
                }
            }
            manager.send_event(value).await;
        }
        _ => manager.send_event(value).await,
    }
}

fn route_audio_input(manager: &Arc<SessionManager>, value: &Value) {
    let body = &value["event"]["audioInput"];
    let (Some(prompt_name), Some(content_name), Some(content)) = (
        body["promptName"].as_str(),
        body["contentName"].as_str(),
        body["content"].as_str(),
    ) else {
        warn!("audioInput envelope missing required fields, dropping");
        return;
    };
    manager.enqueue_audio(prompt_name, content_name, content);
}
