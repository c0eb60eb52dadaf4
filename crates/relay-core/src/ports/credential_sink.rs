//! The process-wide credentials surface the Credential Refresher mutates
//! (spec §4.6, §9).
//!
//! The Python reference mutates `os.environ` directly because the Bedrock
//! client reads credentials from the process environment at call time. The
//! design note in spec §9 calls out that "an implementation preferring
//! explicit injection should pass a credentials provider into the transport
//! constructor and mutate the provider instead of process state; this is a
//! behavior-preserving refactor" — this trait is that seam. The production
//! implementation in `relay-session` mutates the environment (source-
//! compatible default); a test double can hold an in-memory map instead.

/// Temporary AWS-style credentials as published by IMDS.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
}

/// A sink the Credential Refresher publishes refreshed credentials to.
pub trait CredentialSink: Send + Sync {
    /// Publish a freshly fetched credential triple.
    fn publish(&self, credentials: &Credentials);

    /// Whether ambient static credentials are already present — if so, the
    /// refresher does nothing on startup (spec §4.6).
    fn has_static_credentials(&self) -> bool;
}
