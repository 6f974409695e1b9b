//! Session scenarios driven through a scripted transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;

use redline_core::{Document, DocumentInfo};
use redline_runtime::{
    AgentTransport, ByteStream, EntryKind, Phase, SessionController, SessionUpdate, SubmitRequest,
    TransportError,
};
use redline_stream::DecoderOptions;

const TIMEOUT: Duration = Duration::from_secs(5);

type Chunk = Result<Bytes, TransportError>;

/// Transport whose response bodies are fed by the test.
#[derive(Default)]
struct ScriptedTransport {
    bodies: Mutex<Vec<mpsc::UnboundedReceiver<Chunk>>>,
    requests: Mutex<Vec<SubmitRequest>>,
    cancels: Mutex<usize>,
}

impl ScriptedTransport {
    /// Queue a response body and return the sender that feeds it.
    fn queue_body(&self) -> mpsc::UnboundedSender<Chunk> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.bodies.lock().push(rx);
        tx
    }
}

#[async_trait]
impl AgentTransport for ScriptedTransport {
    async fn setup(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<ByteStream, TransportError> {
        self.requests.lock().push(request.clone());
        let mut bodies = self.bodies.lock();
        if bodies.is_empty() {
            return Err(TransportError::Status {
                endpoint: "/message/".into(),
                status: 500,
            });
        }
        let rx = bodies.remove(0);
        let body = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|chunk| (chunk, rx))
        });
        Ok(body.boxed())
    }

    async fn cancel(&self) -> Result<(), TransportError> {
        *self.cancels.lock() += 1;
        Ok(())
    }

    async fn clear_context(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

fn chunk(text: &str) -> Chunk {
    Ok(Bytes::copy_from_slice(text.as_bytes()))
}

async fn session(doc: serde_json::Value) -> (SessionController, Arc<ScriptedTransport>) {
    let transport = Arc::new(ScriptedTransport::default());
    let controller = SessionController::with_options(transport.clone(), 20, DecoderOptions::default());
    controller
        .load_document(Document::new(doc), DocumentInfo::untitled(16))
        .await;
    (controller, transport)
}

async fn next_matching(
    rx: &mut tokio::sync::broadcast::Receiver<SessionUpdate>,
    pred: impl Fn(&SessionUpdate) -> bool,
) -> SessionUpdate {
    timeout(TIMEOUT, async {
        loop {
            let update = rx.recv().await.unwrap();
            if pred(&update) {
                return update;
            }
        }
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn record_split_across_chunks_yields_one_message() {
    let (controller, transport) = session(json!({"a": 1})).await;
    let body = transport.queue_body();
    let handle = controller.submit("hello").unwrap();

    body.send(chunk("{\"type\":\"mess")).unwrap();
    body.send(chunk("age\",\"content\":\"hi\"}\n")).unwrap();
    drop(body);

    let summary = timeout(TIMEOUT, handle.wait()).await.unwrap().unwrap();
    assert_eq!(summary.events_routed, 1);

    let view = controller.view();
    let agent: Vec<_> = view
        .transcript
        .iter()
        .filter(|e| e.kind == EntryKind::Message)
        .collect();
    assert_eq!(agent.len(), 1);
    assert_eq!(agent[0].text, "hi");
}

#[tokio::test]
async fn garbage_line_does_not_stop_the_stream() {
    let (controller, transport) = session(json!({"a": 1})).await;
    let body = transport.queue_body();
    let handle = controller.submit("hello").unwrap();

    body.send(chunk("not json at all\n")).unwrap();
    body.send(chunk("{\"type\":\"message\",\"content\":\"still here\"}\n")).unwrap();
    drop(body);

    let summary = timeout(TIMEOUT, handle.wait()).await.unwrap().unwrap();
    assert_eq!(summary.lines_skipped, 1);
    assert_eq!(controller.view().transcript.last().unwrap().text, "still here");
}

#[tokio::test]
async fn remove_then_submit_sends_nothing() {
    let (controller, transport) = session(json!({"a": 1})).await;
    assert!(controller.remove_document().await);
    let before = controller.view();

    assert!(controller.submit("edit it").is_none());

    let after = controller.view();
    assert!(transport.requests.lock().is_empty());
    assert_eq!(after.phase, Phase::Idle);
    assert_eq!(after.transcript.len(), before.transcript.len());
    assert!(after.document.is_none());
}

#[tokio::test]
async fn submit_while_streaming_is_ignored() {
    let (controller, transport) = session(json!({})).await;
    let body = transport.queue_body();
    let handle = controller.submit("first").unwrap();

    assert!(controller.submit("second").is_none());
    assert_eq!(controller.view().phase, Phase::Streaming);

    drop(body);
    let _ = timeout(TIMEOUT, handle.wait()).await.unwrap().unwrap();
    assert_eq!(transport.requests.lock().len(), 1);
}

#[tokio::test]
async fn request_carries_document_and_selection() {
    let (controller, transport) = session(json!({"rows": [1, 2]})).await;
    controller.set_selection(vec!["row-1".into(), "row-2".into()]);
    let body = transport.queue_body();
    let handle = controller.submit("  sum rows ").unwrap();
    drop(body);
    let _ = timeout(TIMEOUT, handle.wait()).await.unwrap().unwrap();

    let requests = transport.requests.lock();
    assert_eq!(requests[0].query, "sum rows");
    assert_eq!(requests[0].document.value(), &json!({"rows": [1, 2]}));
    assert_eq!(requests[0].selection, vec!["row-1", "row-2"]);
}

#[tokio::test]
async fn cancel_is_acknowledged_by_event() {
    let (controller, transport) = session(json!({"a": 1})).await;
    let mut rx = controller.subscribe();
    let body = transport.queue_body();
    let handle = controller.submit("long task").unwrap();

    assert!(controller.cancel().await);
    assert_eq!(controller.view().phase, Phase::Cancelling);
    assert_eq!(*transport.cancels.lock(), 1);

    body.send(chunk("{\"type\":\"cancelled\"}\n")).unwrap();
    let _ = next_matching(&mut rx, |u| *u == SessionUpdate::PhaseChanged(Phase::Idle)).await;
    assert!(!controller.view().cancelling);

    // a result already in flight still lands after the acknowledgement
    body.send(chunk("{\"type\":\"tool_result\",\"payload\":{\"a\":9}}\n")).unwrap();
    drop(body);
    let summary = timeout(TIMEOUT, handle.wait()).await.unwrap().unwrap();
    assert_eq!(summary.documents_committed, 1);
    assert_eq!(controller.snapshot().unwrap().value(), &json!({"a": 9}));
    assert_eq!(controller.view().transcript.last().unwrap().text, "🛑 Request cancelled");
}

#[tokio::test]
async fn stream_end_returns_to_idle_without_acknowledgement() {
    let (controller, transport) = session(json!({})).await;
    let body = transport.queue_body();
    let handle = controller.submit("go").unwrap();
    assert!(controller.cancel().await);

    drop(body);
    let _ = timeout(TIMEOUT, handle.wait()).await.unwrap().unwrap();
    let view = controller.view();
    assert_eq!(view.phase, Phase::Idle);
    assert!(!view.loading);
}

#[tokio::test]
async fn transport_failure_is_surfaced_and_clears_flags() {
    let (controller, transport) = session(json!({"a": 1})).await;
    let mut rx = controller.subscribe();
    let body = transport.queue_body();
    let handle = controller.submit("go").unwrap();

    body.send(chunk("{\"type\":\"compressing_context\"}\n")).unwrap();
    body.send(chunk("{\"type\":\"tool_result\",\"payload\":{\"a\":2}}\n")).unwrap();
    body.send(Err(TransportError::Interrupted("connection reset".into()))).unwrap();
    drop(body);

    let err = timeout(TIMEOUT, handle.wait()).await.unwrap().unwrap_err();
    assert_eq!(err.category(), "transport");

    let finished = next_matching(&mut rx, |u| matches!(u, SessionUpdate::RequestFinished { .. })).await;
    assert_eq!(
        finished,
        SessionUpdate::RequestFinished {
            request_id: 1,
            error: Some("stream interrupted: connection reset".into()),
        }
    );

    let view = controller.view();
    assert_eq!(view.phase, Phase::Idle);
    assert!(!view.compressing_context);
    assert_eq!(view.last_error.as_deref(), Some("stream interrupted: connection reset"));
    // applied before the failure, so it stays
    assert_eq!(controller.snapshot().unwrap().value(), &json!({"a": 2}));
}

#[tokio::test]
async fn rejected_submit_is_a_failed_request() {
    let (controller, _transport) = session(json!({})).await;
    // no body queued, so the transport answers HTTP 500
    let handle = controller.submit("go").unwrap();
    let err = timeout(TIMEOUT, handle.wait()).await.unwrap().unwrap_err();
    assert_eq!(err.to_string(), "Transport error: /message/ returned HTTP 500");
    assert_eq!(controller.view().phase, Phase::Idle);

    // the session accepts the next prompt
    assert!(controller.submit("again").is_some());
}

#[tokio::test]
async fn undo_after_streamed_edits() {
    let (controller, transport) = session(json!({"a": 1})).await;
    let body = transport.queue_body();
    let handle = controller.submit("step").unwrap();
    body.send(chunk("{\"type\":\"tool_result\",\"payload\":{\"a\":2}}\n")).unwrap();
    body.send(chunk("{\"type\":\"tool_result\",\"payload\":\"{\\\"a\\\":3}\"}\n")).unwrap();
    drop(body);
    let _ = timeout(TIMEOUT, handle.wait()).await.unwrap().unwrap();

    assert!(controller.undo().unwrap());
    assert!(controller.undo().unwrap());
    assert!(controller.redo().unwrap());
    assert_eq!(controller.snapshot().unwrap().value(), &json!({"a": 2}));
    assert!(controller.can_redo());
}
