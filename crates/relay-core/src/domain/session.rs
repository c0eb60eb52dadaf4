//! Session data model (spec §3).
//!
//! The runtime session — queues, task handles, the backend stream handle —
//! lives in `relay-session`; this module holds the plain data that crosses
//! crate boundaries: correlation state, the state machine, and the two
//! record types carried on the queues.

use serde::{Deserialize, Serialize};

/// Ingress queue capacity: ~2-3 seconds of audio at typical chunk sizes.
pub const INGRESS_QUEUE_CAPACITY: usize = 100;

/// Egress queue capacity: larger than ingress since responses interleave
/// text, audio, and tool-dispatch events.
pub const EGRESS_QUEUE_CAPACITY: usize = 200;

/// Lifecycle state of a [`Session`].
///
/// Transitions are monotonic: `Created -> Initializing -> Active -> Closing
/// -> Closed`, with `Initializing -> Closed` on init failure. There is no
/// resurrection — a session that reaches `Closed` stays there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Constructed, `initialize()` not yet called.
    Created,
    /// `initialize()` in flight.
    Initializing,
    /// Backend stream open, pumps running.
    Active,
    /// `close()` in flight.
    Closing,
    /// Terminal. A further `close()` is a no-op.
    Closed,
}

/// Correlation metadata and lifecycle state for one client-to-backend
/// conversation.
///
/// Owns no I/O — see `relay_session::SessionManager` for the queues, task
/// handles, and backend stream handle that accompany this data in a running
/// session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Immutable for the lifetime of the session.
    pub region: String,
    /// Immutable for the lifetime of the session.
    pub model_id: String,
    /// Current lifecycle state.
    pub state: SessionState,
    /// Set by the client during conversation setup; reset on every new
    /// logical conversation (`reset()`), nulled again on `close()`.
    pub prompt_name: Option<String>,
    /// Content-block correlation name for the current text/tool content.
    pub content_name: Option<String>,
    /// Content-block correlation name for the current audio content.
    pub audio_content_name: Option<String>,
}

impl Session {
    /// Construct a new, unstarted session.
    #[must_use]
    pub fn new(region: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            model_id: model_id.into(),
            state: SessionState::Created,
            prompt_name: None,
            content_name: None,
            audio_content_name: None,
        }
    }

    /// Whether the session is in the `Active` state.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Clear correlation names — used both by `reset()` (new logical
    /// conversation on the same connection) and by `close()`.
    pub fn clear_correlation_names(&mut self) {
        self.prompt_name = None;
        self.content_name = None;
        self.audio_content_name = None;
    }
}

/// One audio chunk queued by the client for the Ingress Pump.
///
/// `audio_bytes` is already base64-framed for the wire by the client
/// adapter — this type does not re-encode it.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub prompt_name: String,
    pub content_name: String,
    pub audio_bytes: String,
}

/// A `toolUse` event observed by the Egress Pump, held until the matching
/// `contentEnd(type=TOOL)` event arrives.
#[derive(Debug, Clone)]
pub struct ToolUseRecord {
    pub tool_name: String,
    pub tool_use_id: String,
    /// The tool-use event's `content` object, JSON-shaped per spec §3.
    pub content: serde_json::Value,
}

/// Alias kept for readability at call sites that store the "most recent
/// tool-use envelope observed" (spec §3's `pending_tool`).
pub type PendingTool = ToolUseRecord;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_created_and_inactive() {
        let session = Session::new("us-east-1", "demo-model");
        assert_eq!(session.state, SessionState::Created);
        assert!(!session.is_active());
        assert!(session.prompt_name.is_none());
    }

    #[test]
    fn clear_correlation_names_nulls_all_three() {
        let mut session = Session::new("us-east-1", "demo-model");
        session.prompt_name = Some("p1".into());
        session.content_name = Some("c1".into());
        session.audio_content_name = Some("a1".into());

        session.clear_correlation_names();

        assert!(session.prompt_name.is_none());
        assert!(session.content_name.is_none());
        assert!(session.audio_content_name.is_none());
    }
}
