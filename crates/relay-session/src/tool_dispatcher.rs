//! The Tool Dispatcher (spec §4.4) and the tool-handler registry it looks
//! handlers up in.
//!
//! Registry shape is grounded on `gglib-mcp::manager::McpManager`'s
//! name-keyed map of registered tools, simplified: this registry has no
//! start/stop lifecycle of its own, since handlers here are in-process
//! functions rather than spawned MCP server processes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use relay_core::{EventBuilder, ToolHandler, ToolUseRecord};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::session_manager::SessionManager;

/// Fixed failure string substituted for any tool-handler error (spec §4.4,
/// §7 `ToolHandlerError`) — dispatch never propagates a handler's failure to
/// the session.
const TOOL_FAILURE_MESSAGE: &str =
    "An error occurred while attempting to retrieve information related to the toolUse event.";

/// A case-folded, name-keyed table of available [`ToolHandler`]s.
pub struct ToolRegistry {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under its case-folded name (spec §9 open question:
    /// tool-name matching is unconditionally case-insensitive).
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        self.handlers.insert(handler.name().to_lowercase(), handler);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.handlers.get(&name.to_lowercase()).cloned()
    }

    /// A registry pre-loaded with the bundled `getDateTool` handler, the
    /// only tool the default tool catalogue (spec §4.5) advertises.
    #[must_use]
    pub fn with_default_tools() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(GetDateTool));
        registry
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the current UTC date and time formatted the same way as the
/// Python reference's `get_date_tool` (`"%A, %Y-%m-%d %H:%M:%S"` plus a
/// literal `" in UTC"` suffix).
pub struct GetDateTool;

#[async_trait]
impl ToolHandler for GetDateTool {
    fn name(&self) -> &str {
        "getdatetool"
    }

    async fn call(&self, _content: &Value) -> Result<Value, String> {
        let now = chrono::Utc::now();
        Ok(Value::String(format!(
            "{} in UTC",
            now.format("%A, %Y-%m-%d %H:%M:%S")
        )))
    }
}

impl SessionManager {
    /// Spawn one tool-dispatch task, tracked in `tool_tasks` until it
    /// completes or `close()`/`reset()` cancels it.
    pub(crate) async fn spawn_tool_dispatch(
        self: &Arc<Self>,
        prompt_name: String,
        pending: ToolUseRecord,
    ) {
        let manager = Arc::clone(self);
        let handle = tokio::spawn(async move {
            manager.run_tool_dispatch(&prompt_name, pending).await;
            let id = tokio::task::id();
            manager.tool_tasks.lock().await.remove(&id);
        });
        let id = handle.id();
        self.tool_tasks.lock().await.insert(id, handle);
    }

    async fn run_tool_dispatch(self: &Arc<Self>, prompt_name: &str, pending: ToolUseRecord) {
        tracing::info!(tool = %pending.tool_name, id = %pending.tool_use_id, "dispatching tool");

        let result = self.invoke_tool(&pending.tool_name, &pending.content).await;
        let tool_content_name = Uuid::new_v4().to_string();

        let start =
            EventBuilder::content_start_tool(prompt_name, &tool_content_name, &pending.tool_use_id);
        self.send_and_enqueue(start).await;

        let content = result.to_string();
        let tool_result = EventBuilder::tool_result(prompt_name, &tool_content_name, &content);
        self.send_and_enqueue(tool_result).await;

        let end = EventBuilder::content_end(prompt_name, &tool_content_name);
        self.send_and_enqueue(end).await;
    }

    /// Invoke the named handler (case-folded), falling back to `"no result
    /// found"` for an unknown tool and the fixed failure string for a
    /// handler error — always wrapped as `{"result": ...}`, matching the
    /// Python reference's `processToolUse`.
    async fn invoke_tool(&self, tool_name: &str, content: &Value) -> Value {
        let outcome = match self.tools.get(tool_name) {
            Some(handler) => handler.call(content).await,
            None => Ok(Value::String("no result found".to_string())),
        };
        let result = match outcome {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(tool = %tool_name, error = %err, "tool handler failed");
                Value::String(TOOL_FAILURE_MESSAGE.to_string())
            }
        };
        json!({ "result": result })
    }

    async fn send_and_enqueue(self: &Arc<Self>, envelope: Value) {
        self.send_event(envelope.clone()).await;
        self.try_enqueue_egress(envelope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session_manager::SessionManager;
    use crate::test_support::FakeBackendTransportFactory;

    fn manager() -> Arc<SessionManager> {
        SessionManager::new(
            "us-east-1",
            "demo-model",
            Arc::new(FakeBackendTransportFactory::default()),
            Arc::new(ToolRegistry::with_default_tools()),
        )
    }

    fn pending(tool_name: &str, tool_use_id: &str) -> ToolUseRecord {
        ToolUseRecord {
            tool_name: tool_name.to_string(),
            tool_use_id: tool_use_id.to_string(),
            content: json!({"content": "{}"}),
        }
    }

    /// Spec §8 testable property 5 / scenario S2: a `toolUse`/`contentEnd`
    /// pair produces exactly three events with a matching `contentName`.
    #[tokio::test]
    async fn dispatch_emits_three_events_with_matching_content_name() {
        let manager = manager();
        manager.initialize().await.unwrap();

        manager
            .spawn_tool_dispatch("p1".to_string(), pending("getDateTool", "t1"))
            .await;

        let start = manager.recv_egress().await.expect("contentStart");
        let result = manager.recv_egress().await.expect("toolResult");
        let end = manager.recv_egress().await.expect("contentEnd");

        let content_name = start["event"]["contentStart"]["contentName"]
            .as_str()
            .unwrap()
            .to_string();
        assert_eq!(
            start["event"]["contentStart"]["toolResultInputConfiguration"]["toolUseId"],
            "t1"
        );
        assert_eq!(result["event"]["toolResult"]["contentName"], content_name);
        assert_eq!(end["event"]["contentEnd"]["contentName"], content_name);

        manager.close().await;
    }

    #[tokio::test]
    async fn unknown_tool_name_returns_no_result_found() {
        let manager = manager();
        manager.initialize().await.unwrap();

        manager
            .spawn_tool_dispatch("p1".to_string(), pending("notARealTool", "t2"))
            .await;

        let _ = manager.recv_egress().await.unwrap(); // contentStart
        let result = manager.recv_egress().await.unwrap(); // toolResult
        let content: Value =
            serde_json::from_str(result["event"]["toolResult"]["content"].as_str().unwrap())
                .unwrap();
        assert_eq!(content["result"], "no result found");

        manager.close().await;
    }

    #[tokio::test]
    async fn tool_name_matching_is_case_insensitive() {
        let manager = manager();
        manager.initialize().await.unwrap();

        manager
            .spawn_tool_dispatch("p1".to_string(), pending("GETDATETOOL", "t3"))
            .await;

        let _ = manager.recv_egress().await.unwrap(); // contentStart
        let result = manager.recv_egress().await.unwrap(); // toolResult
        let content: Value =
            serde_json::from_str(result["event"]["toolResult"]["content"].as_str().unwrap())
                .unwrap();
        assert_ne!(content["result"], "no result found");

        manager.close().await;
    }

    struct FailingTool;

    #[async_trait]
    impl ToolHandler for FailingTool {
        fn name(&self) -> &str {
            "failingtool"
        }

        async fn call(&self, _content: &Value) -> Result<Value, String> {
            Err("boom".to_string())
        }
    }

    #[tokio::test]
    async fn handler_error_becomes_fixed_failure_string() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(FailingTool));
        let manager = SessionManager::new(
            "us-east-1",
            "demo-model",
            Arc::new(FakeBackendTransportFactory::default()),
            Arc::new(registry),
        );
        manager.initialize().await.unwrap();

        manager
            .spawn_tool_dispatch("p1".to_string(), pending("failingTool", "t4"))
            .await;

        let _ = manager.recv_egress().await.unwrap(); // contentStart
        let result = manager.recv_egress().await.unwrap(); // toolResult
        let content: Value =
            serde_json::from_str(result["event"]["toolResult"]["content"].as_str().unwrap())
                .unwrap();
        assert_eq!(content["result"], TOOL_FAILURE_MESSAGE);

        manager.close().await;
    }
}
