//! The Session Manager (spec §4.1): owns the backend stream handle, the
//! bounded ingress/egress queues, in-flight tool-dispatch tasks, and the
//! session state machine.
//!
//! Grounded on `s2s_session_manager.py`'s `S2sSessionManager` class almost
//! method-for-method; the two pump loops and the tool dispatcher live in
//! sibling modules as additional `impl SessionManager` blocks, mirroring how
//! the Python class keeps them as methods on `self` rather than separate
//! objects.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex as StdMutex;
use std::sync::Arc;
use std::time::Duration;

use relay_core::{
    AudioChunk, BackendTransport, BackendTransportFactory, Session, SessionState, ToolUseRecord,
    EGRESS_QUEUE_CAPACITY, INGRESS_QUEUE_CAPACITY,
};
use serde_json::Value;
use tokio::sync::{mpsc, Mutex as TokioMutex};
use tokio::task::{Id as TaskId, JoinHandle};
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::tool_dispatcher::ToolRegistry;

pub(crate) struct PumpHandles {
    pub(crate) ingress: JoinHandle<()>,
    pub(crate) egress: JoinHandle<()>,
}

/// Runtime counterpart to [`relay_core::Session`]: adds the queues, the
/// backend stream handle, and in-flight task bookkeeping that spec §3
/// describes but which have no business living in a plain data struct.
pub struct SessionManager {
    pub(crate) session: StdMutex<Session>,
    pub(crate) transport_factory: Arc<dyn BackendTransportFactory>,
    pub(crate) transport: TokioMutex<Option<Arc<dyn BackendTransport>>>,
    pub(crate) active: AtomicBool,
    pub(crate) closed: AtomicBool,
    pub(crate) ingress_tx: mpsc::Sender<AudioChunk>,
    pub(crate) ingress_rx: TokioMutex<mpsc::Receiver<AudioChunk>>,
    pub(crate) egress_tx: mpsc::Sender<Value>,
    pub(crate) egress_rx: TokioMutex<mpsc::Receiver<Value>>,
    pub(crate) tool_tasks: TokioMutex<HashMap<TaskId, JoinHandle<()>>>,
    pub(crate) pending_tool: StdMutex<Option<ToolUseRecord>>,
    pub(crate) tools: Arc<ToolRegistry>,
    pub(crate) pumps: TokioMutex<Option<PumpHandles>>,
}

impl SessionManager {
    /// Construct a new, unstarted session. Call [`Self::initialize`] to open
    /// the backend stream and start the pumps.
    #[must_use]
    pub fn new(
        region: impl Into<String>,
        model_id: impl Into<String>,
        transport_factory: Arc<dyn BackendTransportFactory>,
        tools: Arc<ToolRegistry>,
    ) -> Arc<Self> {
        let (ingress_tx, ingress_rx) = mpsc::channel(INGRESS_QUEUE_CAPACITY);
        let (egress_tx, egress_rx) = mpsc::channel(EGRESS_QUEUE_CAPACITY);
        Arc::new(Self {
            session: StdMutex::new(Session::new(region, model_id)),
            transport_factory,
            transport: TokioMutex::new(None),
            active: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            ingress_tx,
            ingress_rx: TokioMutex::new(ingress_rx),
            egress_tx,
            egress_rx: TokioMutex::new(egress_rx),
            tool_tasks: TokioMutex::new(HashMap::new()),
            pending_tool: StdMutex::new(None),
            tools,
            pumps: TokioMutex::new(None),
        })
    }

    /// Whether `active` is currently set (spec §3 invariant: `active == true`
    /// iff the backend stream is open and the Egress Pump is running).
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.session.lock().unwrap().state
    }

    /// A snapshot of the correlation/state data. Cheap clone, no I/O.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.session.lock().unwrap().clone()
    }

    pub fn set_prompt_name(&self, name: impl Into<String>) {
        self.session.lock().unwrap().prompt_name = Some(name.into());
    }

    pub fn set_content_name(&self, name: impl Into<String>) {
        self.session.lock().unwrap().content_name = Some(name.into());
    }

    pub fn set_audio_content_name(&self, name: impl Into<String>) {
        self.session.lock().unwrap().audio_content_name = Some(name.into());
    }

    /// Open the backend stream via the configured factory.
    ///
    /// Split out of [`Self::initialize`] so a caller that needs to reject a
    /// connection *before* committing to it (e.g. an HTTP upgrade handler
    /// that wants to answer a failed backend with a rejected upgrade rather
    /// than a silently-dropped socket) can run the fallible half first and
    /// hand the already-open transport to [`Self::start`] afterward. Only
    /// this failure mode propagates to the caller (spec §7); every other
    /// runtime error is logged or turned into a client-visible event.
    pub async fn open_transport(&self) -> Result<Arc<dyn BackendTransport>, SessionError> {
        {
            let mut session = self.session.lock().unwrap();
            session.state = SessionState::Initializing;
        }

        let (region, model_id) = {
            let session = self.session.lock().unwrap();
            (session.region.clone(), session.model_id.clone())
        };

        match self.transport_factory.open(&region, &model_id).await {
            Ok(transport) => Ok(transport),
            Err(err) => {
                tracing::error!(error = %err, "failed to open backend stream");
                self.session.lock().unwrap().state = SessionState::Closed;
                Err(SessionError::BackendInit(err.to_string()))
            }
        }
    }

    /// Adopt an already-open backend stream, mark the session `Active`, and
    /// spawn the Ingress and Egress Pumps. Infallible: the caller is
    /// expected to have obtained `transport` from [`Self::open_transport`]
    /// (or an equivalent already-successful open) first.
    pub async fn start(self: &Arc<Self>, transport: Arc<dyn BackendTransport>) {
        let (region, model_id) = {
            let session = self.session.lock().unwrap();
            (session.region.clone(), session.model_id.clone())
        };

        *self.transport.lock().await = Some(transport);
        self.active.store(true, Ordering::SeqCst);
        {
            let mut session = self.session.lock().unwrap();
            session.state = SessionState::Active;
        }

        let egress = tokio::spawn({
            let manager = Arc::clone(self);
            async move { manager.egress_pump_loop().await }
        });
        let ingress = tokio::spawn({
            let manager = Arc::clone(self);
            async move { manager.ingress_pump_loop().await }
        });
        *self.pumps.lock().await = Some(PumpHandles { ingress, egress });

        // Mirrors the Python reference's post-init settle (`await
        // asyncio.sleep(0.1)`) giving the backend a moment before the first
        // event is sent.
        tokio::time::sleep(Duration::from_millis(100)).await;

        info!(region = %region, model_id = %model_id, "session initialized");
    }

    /// Open the backend stream via the configured factory, mark the session
    /// `Active`, and spawn the Ingress and Egress Pumps.
    ///
    /// Only this method's failure propagates to the caller (spec §7); every
    /// other runtime error is logged or turned into a client-visible event.
    /// Equivalent to [`Self::open_transport`] followed by [`Self::start`];
    /// kept as one call for callers that have no use for the split (tests,
    /// and any caller that doesn't need to reject a connection pre-upgrade).
    pub async fn initialize(self: &Arc<Self>) -> Result<(), SessionError> {
        let transport = self.open_transport().await?;
        self.start(transport).await;
        Ok(())
    }

    /// Encode and send one event envelope to the backend. Failures are
    /// logged, not propagated (spec §7: `SendError` never tears down the
    /// stream). Sending a `sessionEnd` envelope triggers `close()` after the
    /// send completes, per spec §4.1.
    pub async fn send_event(self: &Arc<Self>, envelope: Value) {
        let transport = { self.transport.lock().await.clone() };
        let Some(transport) = transport else {
            warn!("send_event called with no open backend stream");
            return;
        };

        if let Err(err) = transport.send(&envelope).await {
            tracing::error!(error = %err, "failed to send event to backend");
        }

        if relay_core::event_name(&envelope) == Some("sessionEnd") {
            self.close().await;
        }
    }

    /// Non-blocking enqueue of one audio chunk for the Ingress Pump. Drops
    /// the chunk and logs a warning if the ingress queue is full (spec §3,
    /// §5: backpressure never becomes blocking).
    pub fn enqueue_audio(
        &self,
        prompt_name: impl Into<String>,
        content_name: impl Into<String>,
        audio_bytes: impl Into<String>,
    ) {
        let chunk = AudioChunk {
            prompt_name: prompt_name.into(),
            content_name: content_name.into(),
            audio_bytes: audio_bytes.into(),
        };
        if let Err(mpsc::error::TrySendError::Full(_)) = self.ingress_tx.try_send(chunk) {
            warn!("ingress queue full, dropping audio chunk");
        }
    }

    /// Non-blocking enqueue onto the egress queue, stamping a wall-clock
    /// `timestamp` if one isn't already present. Drops the oldest-pending
    /// send and logs on overflow (spec §4.3 step 5).
    pub(crate) fn try_enqueue_egress(&self, mut value: Value) {
        if let Value::Object(ref mut map) = value {
            map.entry("timestamp")
                .or_insert_with(|| Value::from(Self::now_millis()));
        }
        match self.egress_tx.try_send(value) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("egress queue full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }

    /// Receive the next event off the egress queue, for the front-end
    /// adapter to forward to the client. `None` once the queue is closed.
    pub async fn recv_egress(&self) -> Option<Value> {
        let mut rx = self.egress_rx.lock().await;
        rx.recv().await
    }

    pub(crate) fn now_millis() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    async fn cancel_tool_tasks(&self) {
        let tasks: Vec<JoinHandle<()>> = {
            let mut guard = self.tool_tasks.lock().await;
            guard.drain().map(|(_, handle)| handle).collect()
        };
        for handle in &tasks {
            handle.abort();
        }
        for handle in tasks {
            let _ = handle.await;
        }
    }

    async fn drain_queues(&self) {
        {
            let mut rx = self.ingress_rx.lock().await;
            while rx.try_recv().is_ok() {}
        }
        {
            let mut rx = self.egress_rx.lock().await;
            while rx.try_recv().is_ok() {}
        }
    }

    /// Reset correlation state for a new logical conversation on the same
    /// connection: cancels in-flight tool tasks, drains both queues, and
    /// nulls `prompt_name`/`content_name`/`audio_content_name`. Unlike
    /// `close()`, the backend stream and pumps are left running.
    pub async fn reset(&self) {
        self.cancel_tool_tasks().await;
        self.drain_queues().await;
        *self.pending_tool.lock().unwrap() = None;
        self.session.lock().unwrap().clear_correlation_names();
    }

    /// Idempotent teardown (spec §4.1). A second call is a no-op.
    pub async fn close(self: &Arc<Self>) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        info!("closing session");
        self.active.store(false, Ordering::SeqCst);
        self.session.lock().unwrap().state = SessionState::Closing;

        self.cancel_tool_tasks().await;
        self.drain_queues().await;

        *self.pending_tool.lock().unwrap() = None;
        self.session.lock().unwrap().clear_correlation_names();

        let transport = self.transport.lock().await.take();
        if let Some(transport) = transport {
            transport.close().await;
        }

        // The Egress Pump never calls close() inline on its own exit (see
        // `egress_pump_loop`) — it hands off to a detached task — so it's
        // always safe to abort and await both pump handles here.
        let pumps = self.pumps.lock().await.take();
        if let Some(pumps) = pumps {
            pumps.egress.abort();
            let _ = pumps.egress.await;
            pumps.ingress.abort();
            let _ = pumps.ingress.await;
        }

        self.session.lock().unwrap().state = SessionState::Closed;
        debug!("session closed");
    }
}
