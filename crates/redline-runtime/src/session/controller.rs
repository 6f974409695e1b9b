//! # Session Controller
//!
//! Command surface for one editing session.
//!
//! ```text
//!            submit                 cancel
//!   Idle ───────────▶ Streaming ───────────▶ Cancelling
//!    ▲                   │                       │
//!    └───── stream end ──┘◀── `cancelled` event ─┘
//!                            or stream end
//! ```
//!
//! Each submit bumps the request generation and spawns one pipeline task
//! (transport → [`LineStream`] → [`EventRouter`]). Cancellation is
//! cooperative: the stop signal goes to the agent out of band and the local
//! stream is consumed to its end, so tool results that were already in
//! flight still land.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use redline_core::document::load_file;
use redline_core::{Document, DocumentInfo};
use redline_settings::RedlineSettings;
use redline_stream::{DecoderOptions, LineStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::errors::RuntimeError;
use crate::session::emitter::{SessionUpdate, UpdateEmitter};
use crate::session::router::{EventRouter, RouteSummary};
use crate::session::state::{EntryKind, Phase, Sender, SessionState, SessionView};
use crate::transport::{AgentTransport, SubmitRequest};

/// A spawned request pipeline.
pub struct RequestHandle {
    request_id: u64,
    task: JoinHandle<Result<RouteSummary, RuntimeError>>,
}

impl RequestHandle {
    /// Generation of this request.
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Wait for the stream to end.
    pub async fn wait(self) -> Result<RouteSummary, RuntimeError> {
        self.task
            .await
            .map_err(|e| RuntimeError::Task(e.to_string()))?
    }
}

/// Owns the session state and drives requests against the agent.
pub struct SessionController {
    state: Arc<Mutex<SessionState>>,
    transport: Arc<dyn AgentTransport>,
    emitter: Arc<UpdateEmitter>,
    decoder: DecoderOptions,
}

impl SessionController {
    /// Controller configured from settings.
    pub fn new(transport: Arc<dyn AgentTransport>, settings: &RedlineSettings) -> Self {
        Self::with_options(
            transport,
            settings.history.max_deltas,
            DecoderOptions {
                flush_trailing_fragment: settings.stream.flush_trailing_fragment,
            },
        )
    }

    /// Controller with explicit history bound and decoder options.
    pub fn with_options(
        transport: Arc<dyn AgentTransport>,
        history_limit: usize,
        decoder: DecoderOptions,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new(history_limit))),
            transport,
            emitter: Arc::new(UpdateEmitter::new()),
            decoder,
        }
    }

    /// Receive session updates published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.emitter.subscribe()
    }

    /// Handshake with the backend. Failures are logged and returned.
    #[instrument(skip(self))]
    pub async fn setup(&self) -> Result<(), RuntimeError> {
        match self.transport.setup().await {
            Ok(()) => {
                info!("agent backend ready");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, category = e.category(), "agent setup failed");
                Err(e.into())
            }
        }
    }

    /// Send a prompt about the current document.
    ///
    /// Returns `None` without touching any state unless the session is
    /// idle, a document is loaded, and the trimmed prompt is non-empty.
    /// Must be called from within a Tokio runtime.
    #[instrument(skip_all, fields(request_id))]
    pub fn submit(&self, prompt: &str) -> Option<RequestHandle> {
        let query = prompt.trim();
        let (request_id, request, updates) = {
            let mut state = self.state.lock();
            if state.phase != Phase::Idle || state.document.is_none() || query.is_empty() {
                debug!(
                    phase = ?state.phase,
                    has_document = state.document.is_some(),
                    "submit ignored"
                );
                return None;
            }

            state.active_request += 1;
            state.phase = Phase::Streaming;
            state.last_error = None;
            let id = state.next_event_id();
            let entry = state.append_entry(id, Sender::User, EntryKind::Prompt, query.to_string());
            let request = SubmitRequest {
                query: query.to_string(),
                document: state.history.current().clone(),
                selection: state.selection.clone(),
            };
            (
                state.active_request,
                request,
                [
                    SessionUpdate::TranscriptAppended(entry),
                    SessionUpdate::PhaseChanged(Phase::Streaming),
                ],
            )
        };
        let _ = tracing::Span::current().record("request_id", request_id);
        self.emitter.emit_all(updates);
        info!(request_id, "request submitted");

        let router = EventRouter::new(request_id, Arc::clone(&self.state), Arc::clone(&self.emitter));
        let transport = Arc::clone(&self.transport);
        let decoder = self.decoder;
        let task = tokio::spawn(async move {
            let (summary, error) = match transport.submit(&request).await {
                Ok(body) => router.run(LineStream::new(body, decoder)).await,
                Err(e) => (RouteSummary::default(), Some(e)),
            };
            router.finish(error.as_ref());
            match error {
                Some(e) => Err(e.into()),
                None => Ok(summary),
            }
        });

        Some(RequestHandle { request_id, task })
    }

    /// Ask the agent to stop the streaming request.
    ///
    /// Returns `false` unless a request is streaming. The stop signal is
    /// best effort: failures are logged and the session still waits for the
    /// stream to end.
    #[instrument(skip(self))]
    pub async fn cancel(&self) -> bool {
        {
            let mut state = self.state.lock();
            if state.phase != Phase::Streaming {
                return false;
            }
            state.phase = Phase::Cancelling;
        }
        let _ = self.emitter.emit(SessionUpdate::PhaseChanged(Phase::Cancelling));

        if let Err(e) = self.transport.cancel().await {
            warn!(error = %e, category = e.category(), "cancel signal failed");
        }
        true
    }

    /// Forget the conversation: transcript and selection locally, context
    /// on the agent side. The cost ledger is kept.
    #[instrument(skip(self))]
    pub async fn clear_context(&self) {
        {
            let mut state = self.state.lock();
            state.transcript.clear();
            state.selection.clear();
        }
        let _ = self.emitter.emit(SessionUpdate::ContextCleared);

        if let Err(e) = self.transport.clear_context().await {
            warn!(error = %e, category = e.category(), "clear signal failed");
        }
    }

    /// Replace the document and start a fresh history.
    #[instrument(skip_all, fields(name = %info.name, size = info.size))]
    pub async fn load_document(&self, document: Document, info: DocumentInfo) {
        let update = {
            let mut state = self.state.lock();
            state.history.reset(document);
            state.document = Some(info);
            document_changed(&state)
        };
        let _ = self.emitter.emit(update);
        info!("document loaded");
        self.clear_context().await;
    }

    /// Load a `.json` file and make it the session document.
    pub async fn load_document_file(&self, path: &Path) -> Result<DocumentInfo, RuntimeError> {
        let (document, info) = load_file(path)?;
        self.load_document(document, info.clone()).await;
        Ok(info)
    }

    /// Drop the document. Returns `false` when none was loaded.
    #[instrument(skip(self))]
    pub async fn remove_document(&self) -> bool {
        let update = {
            let mut state = self.state.lock();
            if state.document.take().is_none() {
                return false;
            }
            state.history.reset(Document::null());
            document_changed(&state)
        };
        let _ = self.emitter.emit(update);
        info!("document removed");
        self.clear_context().await;
        true
    }

    /// Step the document back one change.
    pub fn undo(&self) -> Result<bool, RuntimeError> {
        self.step(|state| state.history.undo())
    }

    /// Re-apply the last undone change.
    pub fn redo(&self) -> Result<bool, RuntimeError> {
        self.step(|state| state.history.redo())
    }

    fn step(
        &self,
        op: impl FnOnce(&mut SessionState) -> Result<bool, redline_history::HistoryError>,
    ) -> Result<bool, RuntimeError> {
        let update = {
            let mut state = self.state.lock();
            if !op(&mut state)? {
                return Ok(false);
            }
            document_changed(&state)
        };
        let _ = self.emitter.emit(update);
        Ok(true)
    }

    /// Whether undo is available.
    pub fn can_undo(&self) -> bool {
        self.state.lock().history.can_undo()
    }

    /// Whether redo is available.
    pub fn can_redo(&self) -> bool {
        self.state.lock().history.can_redo()
    }

    /// Replace the selected node ids sent with the next prompt.
    pub fn set_selection(&self, ids: Vec<String>) {
        self.state.lock().selection = ids;
    }

    /// The current document, `None` when nothing is loaded.
    pub fn snapshot(&self) -> Option<Document> {
        let state = self.state.lock();
        state.document.as_ref().map(|_| state.history.current().clone())
    }

    /// Write the current document to `path` as pretty-printed JSON.
    pub fn export(&self, path: &Path) -> Result<(), RuntimeError> {
        let document = self.snapshot().ok_or(RuntimeError::NoDocument)?;
        document.export(path)?;
        info!(?path, "document exported");
        Ok(())
    }

    /// Render-ready copy of the session.
    pub fn view(&self) -> SessionView {
        self.state.lock().view()
    }
}

fn document_changed(state: &SessionState) -> SessionUpdate {
    SessionUpdate::DocumentChanged {
        document: state
            .document
            .as_ref()
            .map(|_| state.history.current().clone()),
        can_undo: state.history.can_undo(),
        can_redo: state.history.can_redo(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TransportError;
    use crate::transport::ByteStream;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use bytes::Bytes;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers every prompt with the same body.
    #[derive(Default)]
    struct FixedTransport {
        body: String,
        submits: AtomicUsize,
        cancels: AtomicUsize,
        clears: AtomicUsize,
    }

    #[async_trait]
    impl AgentTransport for FixedTransport {
        async fn setup(&self) -> Result<(), TransportError> {
            Ok(())
        }

        async fn submit(&self, _request: &SubmitRequest) -> Result<ByteStream, TransportError> {
            let _ = self.submits.fetch_add(1, Ordering::SeqCst);
            let chunk: Result<Bytes, TransportError> = Ok(Bytes::from(self.body.clone()));
            Ok(Box::pin(futures::stream::iter(vec![chunk])))
        }

        async fn cancel(&self) -> Result<(), TransportError> {
            let _ = self.cancels.fetch_add(1, Ordering::SeqCst);
            Err(TransportError::Interrupted("backend gone".into()))
        }

        async fn clear_context(&self) -> Result<(), TransportError> {
            let _ = self.clears.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn controller(body: &str) -> (SessionController, Arc<FixedTransport>) {
        let transport = Arc::new(FixedTransport {
            body: body.to_string(),
            ..FixedTransport::default()
        });
        let controller =
            SessionController::with_options(transport.clone(), 20, DecoderOptions::default());
        (controller, transport)
    }

    #[tokio::test]
    async fn submit_without_document_is_noop() {
        let (controller, transport) = controller("");
        assert!(controller.submit("hello").is_none());
        assert_eq!(transport.submits.load(Ordering::SeqCst), 0);
        assert!(controller.view().transcript.is_empty());
    }

    #[tokio::test]
    async fn blank_prompt_is_noop() {
        let (controller, transport) = controller("");
        controller
            .load_document(Document::new(json!({})), DocumentInfo::untitled(2))
            .await;
        assert!(controller.submit("   ").is_none());
        assert_eq!(transport.submits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn submit_routes_tool_result() {
        let (controller, _) = controller("{\"type\":\"tool_result\",\"payload\":{\"a\":2}}\n");
        controller
            .load_document(Document::new(json!({"a": 1})), DocumentInfo::untitled(7))
            .await;

        let handle = controller.submit("  bump a  ").unwrap();
        let summary = handle.wait().await.unwrap();
        assert_eq!(summary.documents_committed, 1);

        let view = controller.view();
        assert_eq!(view.phase, Phase::Idle);
        assert_eq!(view.transcript[0].text, "bump a");
        assert_eq!(view.transcript[0].sender, Sender::User);
        assert_eq!(controller.snapshot().unwrap().value(), &json!({"a": 2}));
        assert!(controller.can_undo());
    }

    #[tokio::test]
    async fn undo_redo_emit_document_changes() {
        let (controller, _) = controller("{\"type\":\"tool_result\",\"payload\":{\"a\":2}}\n");
        controller
            .load_document(Document::new(json!({"a": 1})), DocumentInfo::untitled(7))
            .await;
        let _ = controller.submit("go").unwrap().wait().await.unwrap();

        let mut rx = controller.subscribe();
        assert!(controller.undo().unwrap());
        assert_matches!(
            rx.recv().await.unwrap(),
            SessionUpdate::DocumentChanged { can_undo: false, can_redo: true, .. }
        );
        assert!(!controller.undo().unwrap());
        assert!(controller.redo().unwrap());
        assert_eq!(controller.snapshot().unwrap().value(), &json!({"a": 2}));
    }

    #[tokio::test]
    async fn cancel_only_while_streaming() {
        let (controller, transport) = controller("");
        assert!(!controller.cancel().await);
        assert_eq!(transport.cancels.load(Ordering::SeqCst), 0);

        controller.state.lock().phase = Phase::Streaming;
        assert!(controller.cancel().await);
        // the failed signal is logged, the phase still advances
        assert_eq!(controller.view().phase, Phase::Cancelling);
        assert_eq!(transport.cancels.load(Ordering::SeqCst), 1);
        assert!(!controller.cancel().await);
    }

    #[tokio::test]
    async fn load_resets_history_and_clears_context() {
        let (controller, transport) = controller("");
        controller.set_selection(vec!["n1".into()]);
        controller
            .load_document(Document::new(json!([1])), DocumentInfo::untitled(3))
            .await;
        assert!(controller.view().selection.is_empty());
        assert!(!controller.can_undo());
        assert_eq!(transport.clears.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn remove_document_drops_snapshot() {
        let (controller, _) = controller("");
        assert!(!controller.remove_document().await);
        controller
            .load_document(Document::new(json!({"x": 1})), DocumentInfo::untitled(7))
            .await;
        assert!(controller.remove_document().await);
        assert!(controller.snapshot().is_none());
        assert!(controller.view().document_info.is_none());
        assert_matches!(
            controller.export(Path::new("/nonexistent/out.json")),
            Err(RuntimeError::NoDocument)
        );
    }

    #[tokio::test]
    async fn clear_context_keeps_costs() {
        let (controller, _) = controller(
            "{\"type\":\"cost\",\"kind\":\"query\",\"cost\":0.5,\"total\":0.5}\n\
             {\"type\":\"message\",\"content\":\"done\"}\n",
        );
        controller
            .load_document(Document::new(json!({})), DocumentInfo::untitled(2))
            .await;
        let _ = controller.submit("hi").unwrap().wait().await.unwrap();
        assert_eq!(controller.view().transcript.len(), 2);

        controller.clear_context().await;
        let view = controller.view();
        assert!(view.transcript.is_empty());
        assert_eq!(view.total_cost, "$0.5000");
    }

    #[tokio::test]
    async fn load_document_file_rejects_wrong_extension() {
        let (controller, _) = controller("");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "{}").unwrap();
        assert_matches!(
            controller.load_document_file(&path).await,
            Err(RuntimeError::Document(_))
        );
        assert!(controller.snapshot().is_none());
    }
}
