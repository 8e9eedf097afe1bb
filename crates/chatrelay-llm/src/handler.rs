//! Axum route handlers for the chat page and `POST /chat`

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};
use axum::{Json, Router, routing};
use chatrelay_config::{ChatConfig, ResponseMode};
use chatrelay_core::{ClientPrincipal, DEFAULT_USERNAME, HttpError};
use chatrelay_telemetry::ChatMetrics;
use futures_util::StreamExt;
use http::{HeaderMap, header};

use crate::client::{ChatBackend, ChunkStream};
use crate::error::LlmError;
use crate::prompt::PromptBuilder;
use crate::relay::{JSON_LINES_CONTENT_TYPE, relay};
use crate::types::{ChatMessage, ChatRequest};

const INDEX_PAGE: &str = include_str!("../static/index.html");
const USERNAME_PLACEHOLDER: &str = "{{ username }}";

/// Shared state for chat route handlers
#[derive(Clone)]
pub struct ChatState {
    inner: Arc<ChatStateInner>,
}

struct ChatStateInner {
    backend: Arc<dyn ChatBackend>,
    prompt: PromptBuilder,
    mode: ResponseMode,
    metrics: ChatMetrics,
}

impl ChatState {
    pub fn new(backend: Arc<dyn ChatBackend>, config: &ChatConfig) -> Self {
        Self {
            inner: Arc::new(ChatStateInner {
                backend,
                prompt: PromptBuilder::from_config(config),
                mode: config.mode,
                metrics: ChatMetrics::new(),
            }),
        }
    }
}

/// Build the chat router: the page at `/` and the endpoint at `/chat`
pub fn chat_router(state: ChatState) -> Router {
    Router::new()
        .route("/", routing::get(index))
        .route("/chat", routing::post(chat))
        .with_state(state)
}

/// Handle `GET /`
async fn index(headers: HeaderMap) -> Html<String> {
    let username = ClientPrincipal::username(&headers, DEFAULT_USERNAME);
    Html(INDEX_PAGE.replace(USERNAME_PLACEHOLDER, &escape_html(&username)))
}

/// Handle `POST /chat`
async fn chat(State(state): State<ChatState>, body: Bytes) -> Response {
    let request = match ChatRequest::from_json(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(error = %e, "rejecting chat request");
            return error_response(&e);
        }
    };

    let messages = state.inner.prompt.build(request);
    state.inner.metrics.record_request(state.inner.mode.as_str());

    match state.inner.mode {
        ResponseMode::Stream => stream_response(&state, messages),
        ResponseMode::Single => single_response(&state, &messages).await,
    }
}

/// Stream upstream chunks to the client as NDJSON
///
/// The status is always 200: failures after this point arrive as an
/// in-band error line.
fn stream_response(state: &ChatState, messages: Vec<ChatMessage>) -> Response {
    let backend = Arc::clone(&state.inner.backend);
    let metrics = state.inner.metrics.clone();
    let start = Instant::now();

    let open = async move {
        let chunks = backend
            .stream_chat_completion(&messages)
            .await
            .inspect_err(|e| metrics.record_upstream_error(e.error_type()))?;
        Ok::<_, LlmError>(observe(chunks, metrics, start))
    };

    let body = Body::from_stream(relay(open).map(Ok::<_, Infallible>));

    ([(header::CONTENT_TYPE, JSON_LINES_CONTENT_TYPE)], body).into_response()
}

/// Record per-chunk metrics as chunks pass through
fn observe(chunks: ChunkStream, metrics: ChatMetrics, start: Instant) -> ChunkStream {
    let mut first = true;

    Box::pin(chunks.inspect(move |item| match item {
        Ok(chunk) => {
            if first {
                first = false;
                metrics.record_first_chunk(start);
                tracing::debug!(
                    elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "first chunk received"
                );
            }
            metrics.record_chunk();
            tracing::debug!(content = chunk.content().unwrap_or_default(), "relaying chunk");
        }
        Err(e) => metrics.record_upstream_error(e.error_type()),
    }))
}

/// Answer with one accumulated JSON object
async fn single_response(state: &ChatState, messages: &[ChatMessage]) -> Response {
    match state.inner.backend.chat_completion(messages).await {
        Ok(text) => Json(serde_json::json!({ "response": text })).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "chat completion failed");
            state.inner.metrics.record_upstream_error(e.error_type());
            error_response(&e)
        }
    }
}

/// Convert an error to a JSON error response
fn error_response(error: &LlmError) -> Response {
    let body = serde_json::json!({
        "error": error.client_message(),
        "type": error.error_type(),
    });

    (error.status_code(), Json(body)).into_response()
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}
