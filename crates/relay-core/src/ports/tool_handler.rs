//! The tool-handler port (spec §4.4).
//!
//! Handlers are `async(tool_name, content) -> result`; handler selection by
//! the Tool Dispatcher is case-folded name equality (spec §9 open question,
//! resolved: preserve case-insensitive matching), and an unknown tool name
//! returns the fixed `"no result found"` string rather than an error.

use async_trait::async_trait;
use serde_json::Value;

/// A registered tool implementation.
///
/// Handler exceptions (an `Err` return) are caught by the Tool Dispatcher
/// and turned into the fixed failure string from spec §4.4 — this trait's
/// `Err` type is deliberately untyped (`String`) since the dispatcher never
/// inspects it beyond logging.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// The case-folded name this handler answers to (e.g. `"getdatetool"`).
    fn name(&self) -> &str;

    /// Invoke the handler with the tool-use event's `content` payload.
    async fn call(&self, content: &Value) -> Result<Value, String>;
}
