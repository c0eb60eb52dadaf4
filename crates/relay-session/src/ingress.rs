//! The Ingress Pump (spec §4.2): drains the ingress queue and forwards each
//! audio chunk to the backend as an `audioInput` event.

use std::sync::Arc;

use relay_core::EventBuilder;
use tracing::debug;

use crate::session_manager::SessionManager;

impl SessionManager {
    pub(crate) async fn ingress_pump_loop(self: Arc<Self>) {
        loop {
            if !self.is_active() {
                break;
            }

            let next = {
                let mut rx = self.ingress_rx.lock().await;
                rx.recv().await
            };

            let Some(chunk) = next else {
                break;
            };

            if !self.is_active() {
                break;
            }

            let envelope =
                EventBuilder::audio_input(&chunk.prompt_name, &chunk.content_name, &chunk.audio_bytes);
            self.send_event(envelope).await;
        }
        debug!("ingress pump exited");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use relay_core::INGRESS_QUEUE_CAPACITY;

    use crate::session_manager::SessionManager;
    use crate::test_support::RecordingBackendTransportFactory;
    use crate::tool_dispatcher::ToolRegistry;

    /// Spec scenario S3: enqueuing 250 chunks while the pump is not yet
    /// draining keeps only the first 100 (drop-newest on overflow); once
    /// the pump runs, exactly those 100 are sent to the backend, in order.
    #[tokio::test]
    async fn overflowed_then_drained_queue_sends_exactly_capacity_chunks_in_order() {
        let factory = Arc::new(RecordingBackendTransportFactory::default());
        let transport = Arc::clone(&factory.transport);
        let manager = SessionManager::new(
            "us-east-1",
            "demo-model",
            factory,
            Arc::new(ToolRegistry::with_default_tools()),
        );

        for i in 0..250 {
            manager.enqueue_audio("p1", "c1", format!("chunk-{i}"));
        }

        manager.initialize().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), INGRESS_QUEUE_CAPACITY);
        for (i, envelope) in sent.iter().enumerate() {
            let expected = format!("chunk-{i}");
            assert_eq!(
                envelope["event"]["audioInput"]["content"].as_str(),
                Some(expected.as_str())
            );
        }
        drop(sent);

        manager.close().await;
    }
}
