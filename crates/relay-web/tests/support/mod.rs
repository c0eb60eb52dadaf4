//! A fake backend transport for integration tests, mirroring
//! `relay-session`'s private `test_support` fakes but exported here since
//! this crate's tests sit outside `relay-session` and can't reach a
//! `#[cfg(test)]`-only module in another crate.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use relay_core::{BackendTransport, BackendTransportFactory, TransportError};
use serde_json::Value;

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
/// clone so a test can inspect what a single WebSocket connection sent to
/// the backend after the fact.
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
