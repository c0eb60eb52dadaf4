//! The Egress Pump (spec §4.3): reads frames from the backend, decodes them,
//! stamps a timestamp, and dispatches by event name — storing `toolUse`
//! records, spawning the Tool Dispatcher on the matching `contentEnd`, and
//! enqueuing everything else for the front-end adapter to forward.

use std::sync::Arc;

use relay_core::{BackendTransport, EventBuilder, ToolUseRecord, TransportError};
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::session_manager::SessionManager;

impl SessionManager {
    pub(crate) async fn egress_pump_loop(self: Arc<Self>) {
        loop {
            if !self.is_active() {
                break;
            }

            let transport = { self.transport.lock().await.clone() };
            let Some(transport) = transport else {
                break;
            };

            match transport.receive().await {
                Ok(bytes) => self.handle_inbound_frame(&bytes).await,
                Err(TransportError::EndOfStream) => {
                    info!("backend stream ended");
                    break;
                }
                Err(TransportError::Validation(message)) => {
                    error!(error = %message, "backend validation error");
                    self.try_enqueue_egress(EventBuilder::validation_error(&message));
                }
                Err(err) => {
                    error!(error = %err, "error receiving from backend, ending egress pump");
                    break;
                }
            }
        }

        self.active.store(false, std::sync::atomic::Ordering::SeqCst);
        debug!("egress pump exited, closing session");

        // close() aborts and awaits both pump JoinHandles; calling it inline
        // here (from inside the Egress Pump task itself) would deadlock on
        // its own handle, so teardown is handed off to a detached task.
        let manager = Arc::clone(&self);
        tokio::spawn(async move { manager.close().await });
    }

    async fn handle_inbound_frame(self: &Arc<Self>, bytes: &[u8]) {
        let decoded = std::str::from_utf8(bytes)
            .ok()
            .and_then(|text| serde_json::from_str::<Value>(text).ok());

        let Some(mut event) = decoded else {
            self.try_enqueue_egress(json!({"raw_data": String::from_utf8_lossy(bytes)}));
            return;
        };

        let name = relay_core::event_name(&event).map(str::to_string);

        if let Value::Object(ref mut map) = event {
            map.insert("timestamp".into(), Value::from(Self::now_millis()));
        }

        match name.as_deref() {
            Some("toolUse") => self.record_pending_tool(&event),
            Some("contentEnd") => self.maybe_spawn_tool_dispatch(&event).await,
            _ => {}
        }

        self.try_enqueue_egress(event);
    }

    fn record_pending_tool(&self, event: &Value) {
        let Some(tool_use) = event["event"]["toolUse"].as_object() else {
            return;
        };
        let record = ToolUseRecord {
            tool_name: tool_use
                .get("toolName")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            tool_use_id: tool_use
                .get("toolUseId")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            content: tool_use.get("content").cloned().unwrap_or(Value::Null),
        };
        info!(tool = %record.tool_name, id = %record.tool_use_id, "tool use detected");
        *self.pending_tool.lock().unwrap() = Some(record);
    }

    async fn maybe_spawn_tool_dispatch(self: &Arc<Self>, event: &Value) {
        let content_end = &event["event"]["contentEnd"];
        if content_end["type"].as_str() != Some("TOOL") {
            return;
        }
        let Some(pending) = self.pending_tool.lock().unwrap().take() else {
            return;
        };
        let prompt_name = content_end["promptName"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        self.spawn_tool_dispatch(prompt_name, pending).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use relay_core::TransportError;
    use serde_json::json;

    use crate::session_manager::SessionManager;
    use crate::test_support::ScriptedBackendTransportFactory;
    use crate::tool_dispatcher::ToolRegistry;

    fn manager_with_script(
        frames: Vec<Result<serde_json::Value, TransportError>>,
    ) -> Arc<SessionManager> {
        SessionManager::new(
            "us-east-1",
            "demo-model",
            Arc::new(ScriptedBackendTransportFactory::new(frames)),
            Arc::new(ToolRegistry::with_default_tools()),
        )
    }

    /// Spec §4.3 step 2 / §7 `DecodeError`: a non-JSON frame becomes a
    /// `{raw_data: …}` record instead of tearing down the pump.
    #[tokio::test]
    async fn undecodable_frame_becomes_raw_data_record() {
        let manager = SessionManager::new(
            "us-east-1",
            "demo-model",
            Arc::new(ScriptedBackendTransportFactory::with_raw_frames(vec![
                Ok(b"not valid json at all {".to_vec()),
                Ok(json!({"event": {"promptEnd": {"promptName": "p1"}}})
                    .to_string()
                    .into_bytes()),
            ])),
            Arc::new(ToolRegistry::with_default_tools()),
        );
        manager.initialize().await.unwrap();

        let raw = manager.recv_egress().await.expect("raw_data record");
        assert!(raw["raw_data"].as_str().unwrap().contains("not valid json"));

        let next = manager.recv_egress().await.expect("pump keeps consuming");
        assert_eq!(
            next["event"]["promptEnd"]["promptName"].as_str(),
            Some("p1")
        );

        manager.close().await;
    }

    #[tokio::test]
    async fn backend_validation_error_enqueues_client_visible_event_and_continues() {
        let manager = manager_with_script(vec![
            Err(TransportError::Validation(
                "ValidationException: bad audio format".to_string(),
            )),
            Ok(json!({"event": {"promptEnd": {"promptName": "p1"}}})),
        ]);
        manager.initialize().await.unwrap();

        let error_event = manager.recv_egress().await.expect("error envelope");
        assert_eq!(
            error_event["event"]["error"]["message"],
            "Validation error: ValidationException: bad audio format"
        );

        // Session stays Active and keeps consuming after a validation fault.
        let next = manager.recv_egress().await.expect("promptEnd still flows");
        assert_eq!(
            next["event"]["promptEnd"]["promptName"].as_str(),
            Some("p1")
        );
        assert!(manager.is_active());

        manager.close().await;
    }

    /// Spec scenario S2: `toolUse` followed by `contentEnd(type=TOOL)`
    /// produces both events on the egress queue, then the dispatcher's three
    /// events, with ordering preserved for the backend-sourced pair.
    #[tokio::test]
    async fn tool_use_then_content_end_spawns_dispatch() {
        let manager = manager_with_script(vec![
            Ok(json!({
                "event": {
                    "toolUse": {
                        "toolName": "getDateTool",
                        "toolUseId": "t1",
                        "content": {"content": "{}"},
                    }
                }
            })),
            Ok(json!({
                "event": {"contentEnd": {"promptName": "p1", "type": "TOOL"}}
            })),
        ]);
        manager.initialize().await.unwrap();

        let tool_use = manager.recv_egress().await.expect("toolUse");
        assert_eq!(
            relay_core::event_name(&tool_use),
            Some("toolUse")
        );
        let content_end = manager.recv_egress().await.expect("contentEnd");
        assert_eq!(
            relay_core::event_name(&content_end),
            Some("contentEnd")
        );

        let start = manager.recv_egress().await.expect("tool contentStart");
        let result = manager.recv_egress().await.expect("toolResult");
        let end = manager.recv_egress().await.expect("tool contentEnd");
        assert_eq!(relay_core::event_name(&start), Some("contentStart"));
        assert_eq!(relay_core::event_name(&result), Some("toolResult"));
        assert_eq!(relay_core::event_name(&end), Some("contentEnd"));

        manager.close().await;
    }

    /// Spec §8 testable property 2: a stalled egress consumer keeps the
    /// queue bounded and the pump keeps consuming from the backend rather
    /// than stalling.
    #[tokio::test]
    async fn egress_overflow_drops_newest_and_keeps_pump_alive() {
        let frames = (0..(relay_core::EGRESS_QUEUE_CAPACITY + 50))
            .map(|i| Ok(json!({"event": {"promptEnd": {"promptName": format!("p{i}")}}})))
            .collect();
        let manager = manager_with_script(frames);
        manager.initialize().await.unwrap();

        // Don't drain the egress queue at all; give the pump time to run
        // well past queue capacity without blocking.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let mut rx = manager.egress_rx.lock().await;
        let mut count = 0;
        while rx.try_recv().is_ok() {
            count += 1;
        }
        assert!(count <= relay_core::EGRESS_QUEUE_CAPACITY);
        drop(rx);

        manager.close().await;
    }
}
