//! Plain data types shared across the session manager and the web adapter.

mod session;

pub use session::{
    AudioChunk, PendingTool, Session, SessionState, ToolUseRecord, EGRESS_QUEUE_CAPACITY,
    INGRESS_QUEUE_CAPACITY,
};
