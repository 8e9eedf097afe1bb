//! Mock chat-completions upstream for integration tests
//!
//! Serves both the Azure deployment path and the OpenAI-compatible path,
//! streams scripted SSE chunks, and records every request it receives.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use futures_util::stream;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// What the mock does with a chat request
#[derive(Debug, Clone)]
pub enum Scenario {
    /// Stream one chunk per content fragment, then `[DONE]`
    Chunks(Vec<String>),
    /// Stream each word of the last message back as its own chunk
    Echo,
    /// Stream these raw SSE `data:` payloads as-is, then `[DONE]`
    Raw(Vec<String>),
    /// Stream the first `k` fragments, then drop the connection
    AbortAfter { contents: Vec<String>, k: usize },
    /// Wait `delay` before each chunk
    Slow { contents: Vec<String>, delay: Duration },
    /// Stream the first `k` fragments, then go silent without closing
    StallAfter { contents: Vec<String>, k: usize },
    /// Reject the request with this status and an error envelope
    Status(u16),
}

impl Scenario {
    pub fn chunks(contents: &[&str]) -> Self {
        Self::Chunks(contents.iter().map(|c| (*c).to_owned()).collect())
    }
}

/// One request as seen by the mock
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub query: Option<String>,
    pub api_key: Option<String>,
    pub authorization: Option<String>,
    pub body: Value,
}

impl RecordedRequest {
    /// Roles and contents of the forwarded conversation
    pub fn messages(&self) -> Vec<(String, String)> {
        self.body["messages"]
            .as_array()
            .map(|messages| {
                messages
                    .iter()
                    .map(|m| {
                        (
                            m["role"].as_str().unwrap_or_default().to_owned(),
                            m["content"].as_str().unwrap_or_default().to_owned(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Mock upstream that returns scripted responses
pub struct MockUpstream {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

struct MockState {
    scenario: Scenario,
    requests: Mutex<Vec<RecordedRequest>>,
    frames_pulled: AtomicUsize,
    streams_dropped: AtomicUsize,
}

/// Counts the SSE body as dropped when the stream holding it goes away
struct StreamGuard(Arc<MockState>);

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.0.streams_dropped.fetch_add(1, Ordering::SeqCst);
    }
}

impl MockUpstream {
    /// Start the mock server, returning immediately
    pub async fn start(scenario: Scenario) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            scenario,
            requests: Mutex::new(Vec::new()),
            frames_pulled: AtomicUsize::new(0),
            streams_dropped: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route(
                "/openai/deployments/{deployment}/chat/completions",
                routing::post(handle_chat_completions),
            )
            .route("/v1/chat/completions", routing::post(handle_chat_completions))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Resource endpoint, as configured for Azure OpenAI
    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Base URL for a local OpenAI-compatible server
    pub fn local_base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// SSE frames handed to the connection so far, across all requests
    pub fn frames_pulled(&self) -> usize {
        self.state.frames_pulled.load(Ordering::SeqCst)
    }

    /// SSE bodies that have been dropped, finished or not
    pub fn streams_dropped(&self) -> usize {
        self.state.streams_dropped.load(Ordering::SeqCst)
    }

    /// The only request received so far
    pub fn single_request(&self) -> RecordedRequest {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one upstream request");
        requests.into_iter().next().unwrap()
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn chunk(index: usize, content: &str) -> String {
    json!({
        "id": format!("chatcmpl-mock-{index}"),
        "object": "chat.completion.chunk",
        "created": 1_700_000_000,
        "model": "gpt-4o",
        "choices": [{
            "index": 0,
            "delta": {"content": content},
            "finish_reason": null
        }]
    })
    .to_string()
}

fn last_message_words(body: &Value) -> Vec<String> {
    body["messages"]
        .as_array()
        .and_then(|messages| messages.last())
        .and_then(|message| message["content"].as_str())
        .map(|content| content.split_whitespace().map(str::to_owned).collect())
        .unwrap_or_default()
}

async fn handle_chat_completions(
    State(state): State<Arc<MockState>>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let get_header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned);

    state.requests.lock().unwrap().push(RecordedRequest {
        path: uri.path().to_owned(),
        query: uri.query().map(str::to_owned),
        api_key: get_header("api-key"),
        authorization: get_header("authorization"),
        body: body.clone(),
    });

    let streaming = body["stream"].as_bool().unwrap_or(false);

    let mut stall_after = None;
    let (payloads, delay, abort_after) = match state.scenario.clone() {
        Scenario::Status(status) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let envelope = json!({"error": {"code": status.as_str(), "message": "mock upstream refused the request"}});
            return (status, Json(envelope)).into_response();
        }
        Scenario::Chunks(contents) => (contents.iter().enumerate().map(|(i, c)| chunk(i, c)).collect(), None, None),
        Scenario::Echo => {
            let words = last_message_words(&body);
            (words.iter().enumerate().map(|(i, w)| chunk(i, w)).collect(), None, None)
        }
        Scenario::Raw(payloads) => (payloads, None, None),
        Scenario::AbortAfter { contents, k } => (
            contents.iter().enumerate().map(|(i, c)| chunk(i, c)).collect(),
            None,
            Some(k),
        ),
        Scenario::Slow { contents, delay } => (
            contents.iter().enumerate().map(|(i, c)| chunk(i, c)).collect(),
            Some(delay),
            None,
        ),
        Scenario::StallAfter { contents, k } => {
            stall_after = Some(k);
            (contents.iter().enumerate().map(|(i, c)| chunk(i, c)).collect(), None, None)
        }
    };

    if !streaming {
        return completion_response(&payloads, delay).await;
    }

    sse_response(&state, payloads, delay, abort_after, stall_after)
}

/// Non-streaming answer: the scripted fragments concatenated
async fn completion_response(payloads: &[String], delay: Option<Duration>) -> Response {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let content: String = payloads
        .iter()
        .filter_map(|p| serde_json::from_str::<Value>(p).ok())
        .filter_map(|chunk| chunk["choices"][0]["delta"]["content"].as_str().map(str::to_owned))
        .collect();

    Json(json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "gpt-4o",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    }))
    .into_response()
}

/// Stream `payloads` as SSE events followed by `[DONE]`
///
/// With `abort_after`, the body errors after that many events so the
/// connection is cut mid-stream. With `stall_after`, the body stops
/// producing after that many events but keeps the connection open.
fn sse_response(
    state: &Arc<MockState>,
    payloads: Vec<String>,
    delay: Option<Duration>,
    abort_after: Option<usize>,
    stall_after: Option<usize>,
) -> Response {
    let mut frames: Vec<String> = payloads.into_iter().map(|p| format!("data: {p}\n\n")).collect();
    frames.push("data: [DONE]\n\n".to_owned());

    let frames = Arc::new(frames);
    let guard = StreamGuard(Arc::clone(state));
    let events = stream::unfold((0_usize, guard), move |(index, guard)| {
        let frames = Arc::clone(&frames);
        async move {
            if abort_after == Some(index) {
                // Let the frames already yielded reach the client first
                tokio::time::sleep(Duration::from_millis(50)).await;
                return Some((Err(std::io::Error::other("mock upstream aborted")), (usize::MAX, guard)));
            }

            if stall_after == Some(index) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }

            let frame = frames.get(index)?;
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            guard.0.frames_pulled.fetch_add(1, Ordering::SeqCst);
            Some((Ok(frame.clone()), (index + 1, guard)))
        }
    });

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(events),
    )
        .into_response()
}
