//! Test doubles for [`relay_core::BackendTransport`] / [`relay_core::BackendTransportFactory`],
//! used by this crate's own unit tests. Grounded on `gglib-mcp`'s port-trait
//! pattern, which the same example workspace already exercises with an
//! in-memory stub client for tests that don't want a real MCP server.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use relay_core::{BackendTransport, BackendTransportFactory, TransportError};
use serde_json::Value;
use tokio::sync::Mutex as TokioMutex;

/// Records every envelope sent to it; `receive()` never resolves on its own,
/// so tests that need inbound frames seed them and tests that don't just
/// rely on `close()`/task-abort to end the pump cleanly.
#[derive(Default)]
pub struct FakeBackendTransport {
    pub sent: Mutex<Vec<Value>>,
}

#[async_trait]
impl BackendTransport for FakeBackendTransport {
    async fn send(&self, envelope: &Value) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(envelope.clone());
        Ok(())
    }

    async fn receive(&self) -> Result<Vec<u8>, TransportError> {
        std::future::pending().await
    }

    async fn close(&self) {}
}

#[derive(Default)]
pub struct FakeBackendTransportFactory;

#[async_trait]
impl BackendTransportFactory for FakeBackendTransportFactory {
    async fn open(
        &self,
        _region: &str,
        _model_id: &str,
    ) -> Result<Arc<dyn BackendTransport>, TransportError> {
        Ok(Arc::new(FakeBackendTransport::default()))
    }
}

/// Hands out one pre-built [`FakeBackendTransport`], keeping a concrete
/// (not type-erased) clone so a test can inspect `sent` afterwards —
/// `BackendTransport` objects are otherwise only held as `Arc<dyn ...>`.
#[derive(Default)]
pub struct RecordingBackendTransportFactory {
    pub transport: Arc<FakeBackendTransport>,
}

#[async_trait]
impl BackendTransportFactory for RecordingBackendTransportFactory {
    async fn open(
        &self,
        _region: &str,
        _model_id: &str,
    ) -> Result<Arc<dyn BackendTransport>, TransportError> {
        Ok(Arc::clone(&self.transport) as Arc<dyn BackendTransport>)
    }
}

/// A transport whose `receive()` plays back a fixed, ordered script of
/// inbound frames (or errors), then suspends forever once the script is
/// exhausted — used to drive the Egress Pump through a known inbound
/// sequence (decode failures, validation errors, `toolUse`/`contentEnd`
/// pairs) in a single test.
pub struct ScriptedBackendTransport {
    pub sent: Mutex<Vec<Value>>,
    inbound: TokioMutex<VecDeque<Result<Vec<u8>, TransportError>>>,
}

impl ScriptedBackendTransport {
    #[must_use]
    pub fn new(frames: Vec<Result<Value, TransportError>>) -> Self {
        let inbound = frames
            .into_iter()
            .map(|frame| frame.map(|value| value.to_string().into_bytes()))
            .collect();
        Self {
            sent: Mutex::new(Vec::new()),
            inbound: TokioMutex::new(inbound),
        }
    }

    /// Like [`Self::new`], but frames are raw bytes rather than JSON values —
    /// needed to exercise the `DecodeError` path (spec §7), since a frame
    /// built from a [`Value`] always round-trips through valid JSON.
    #[must_use]
    pub fn with_raw_frames(frames: Vec<Result<Vec<u8>, TransportError>>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            inbound: TokioMutex::new(frames.into_iter().collect()),
        }
    }
}

#[async_trait]
impl BackendTransport for ScriptedBackendTransport {
    async fn send(&self, envelope: &Value) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(envelope.clone());
        Ok(())
    }

    async fn receive(&self) -> Result<Vec<u8>, TransportError> {
        let next = { self.inbound.lock().await.pop_front() };
        match next {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }

    async fn close(&self) {}
}

/// Hands out one pre-built [`ScriptedBackendTransport`], keeping a clone so
/// the test that opened the session can inspect what it sent after the fact.
pub struct ScriptedBackendTransportFactory {
    pub transport: Arc<ScriptedBackendTransport>,
}

impl ScriptedBackendTransportFactory {
    #[must_use]
    pub fn new(frames: Vec<Result<Value, TransportError>>) -> Self {
        Self {
            transport: Arc::new(ScriptedBackendTransport::new(frames)),
        }
    }

    #[must_use]
    pub fn with_raw_frames(frames: Vec<Result<Vec<u8>, TransportError>>) -> Self {
        Self {
            transport: Arc::new(ScriptedBackendTransport::with_raw_frames(frames)),
        }
    }
}

#[async_trait]
impl BackendTransportFactory for ScriptedBackendTransportFactory {
    async fn open(
        &self,
        _region: &str,
        _model_id: &str,
    ) -> Result<Arc<dyn BackendTransport>, TransportError> {
        Ok(Arc::clone(&self.transport) as Arc<dyn BackendTransport>)
    }
}
