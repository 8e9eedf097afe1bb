//! Client for the single upstream chat-completions deployment

use std::pin::Pin;
use std::sync::RwLock;

use async_trait::async_trait;
use chatrelay_auth::{Authorization, Credential};
use chatrelay_config::UpstreamConfig;
use eventsource_stream::{EventStreamError, Eventsource};
use futures_util::{Stream, StreamExt, future};
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use url::Url;

use crate::error::LlmError;
use crate::protocol::openai::{
    ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, DONE_MARKER, ErrorEnvelope,
};
use crate::types::ChatMessage;

/// Upper bound on how much of an upstream error body ends up in messages
const MAX_ERROR_BODY: usize = 512;

/// Chunks of one streaming completion, in upstream order
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk, LlmError>> + Send>>;

/// Something that can answer a conversation
///
/// Implemented by [`UpstreamClient`]; handlers only see this trait.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Open a streaming completion
    ///
    /// Resolves once the upstream has accepted the request. The returned
    /// stream ends after the upstream's `[DONE]` marker or at the first error.
    async fn stream_chat_completion(&self, messages: &[ChatMessage]) -> Result<ChunkStream, LlmError>;

    /// Run a completion to the end and return the assistant text
    async fn chat_completion(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;

    /// Release upstream resources once the server has drained
    fn close(&self) {}
}

/// Resolved chat-completions URL
#[derive(Debug, Clone)]
pub enum Endpoint {
    /// `{endpoint}/openai/deployments/{deployment}/chat/completions?api-version=...`
    Azure(Url),
    /// `{base}/chat/completions` on an OpenAI-compatible server
    Local(Url),
}

impl Endpoint {
    /// Resolve the completions URL; a local endpoint takes precedence
    ///
    /// # Errors
    ///
    /// Returns an error if neither endpoint is configured or the URL is invalid
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, LlmError> {
        if let Some(ref local) = config.local_endpoint {
            let base = local.as_str().trim_end_matches('/');
            return parse_url(&format!("{base}/chat/completions")).map(Self::Local);
        }

        let endpoint = config
            .endpoint
            .as_ref()
            .ok_or_else(|| LlmError::Internal("no upstream endpoint configured".to_owned()))?;

        let mut url = endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| LlmError::Internal(format!("upstream endpoint '{endpoint}' cannot carry a path")))?
            .pop_if_empty()
            .extend(["openai", "deployments", config.deployment.as_str(), "chat", "completions"]);
        url.query_pairs_mut().append_pair("api-version", &config.api_version);

        Ok(Self::Azure(url))
    }

    pub const fn url(&self) -> &Url {
        match self {
            Self::Azure(url) | Self::Local(url) => url,
        }
    }
}

fn parse_url(raw: &str) -> Result<Url, LlmError> {
    Url::parse(raw).map_err(|e| LlmError::Internal(format!("invalid upstream URL '{raw}': {e}")))
}

/// HTTP client bound to one deployment and one credential
pub struct UpstreamClient {
    /// `None` once closed
    http: RwLock<Option<reqwest::Client>>,
    endpoint: Endpoint,
    model: String,
    credential: Credential,
}

impl UpstreamClient {
    /// Build the client; the configured timeout covers each whole upstream call
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint or timeout is invalid or the HTTP
    /// client cannot be built
    pub fn new(config: &UpstreamConfig, credential: Credential) -> Result<Self, LlmError> {
        let endpoint = Endpoint::from_config(config)?;
        let timeout = config.timeout().map_err(|e| LlmError::Internal(e.to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Internal(format!("failed to build HTTP client: {e}")))?;

        tracing::info!(
            url = %endpoint.url(),
            deployment = %config.deployment,
            credential = credential.describe(),
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "upstream client ready"
        );

        Ok(Self {
            http: RwLock::new(Some(http)),
            endpoint,
            model: config.deployment.clone(),
            credential,
        })
    }

    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Handle to the pooled HTTP client, unless closed
    fn http(&self) -> Result<reqwest::Client, LlmError> {
        self.http
            .read()
            .ok()
            .and_then(|http| http.clone())
            .ok_or_else(|| LlmError::Internal("upstream client is closed".to_owned()))
    }

    async fn send(&self, messages: &[ChatMessage], stream: bool) -> Result<reqwest::Response, LlmError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
            stream,
        };

        let request = self.http()?.post(self.endpoint.url().clone()).json(&body);
        let request = match (&self.endpoint, self.credential.authorization().await?) {
            (Endpoint::Azure(_), Authorization::ApiKey(key)) => request.header("api-key", key.expose_secret()),
            (_, Authorization::ApiKey(secret) | Authorization::Bearer(secret)) => {
                request.bearer_auth(secret.expose_secret())
            }
        };

        tracing::debug!(messages = messages.len(), stream, "sending upstream request");

        let response = request.send().await.map_err(|e| {
            tracing::error!(error = %e, "upstream request failed");
            LlmError::from_reqwest(&e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = %status, "upstream returned error");
        Err(status_error(status, &body))
    }
}

/// Map a non-success upstream status and body to an error
fn status_error(status: StatusCode, body: &str) -> LlmError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.chars().take(MAX_ERROR_BODY).collect());

    if status == StatusCode::TOO_MANY_REQUESTS {
        LlmError::RateLimited { message }
    } else {
        LlmError::Upstream {
            status: status.as_u16(),
            message,
        }
    }
}

fn stream_error(error: EventStreamError<reqwest::Error>) -> LlmError {
    match error {
        EventStreamError::Transport(e) => LlmError::from_reqwest(&e),
        other => LlmError::Streaming(other.to_string()),
    }
}

#[async_trait]
impl ChatBackend for UpstreamClient {
    async fn stream_chat_completion(&self, messages: &[ChatMessage]) -> Result<ChunkStream, LlmError> {
        let response = self.send(messages, true).await?;

        let chunks = response
            .bytes_stream()
            .eventsource()
            .take_while(|event| future::ready(!matches!(event, Ok(e) if e.data.trim() == DONE_MARKER)))
            .filter_map(|event| {
                future::ready(match event {
                    Ok(event) if event.data.trim().is_empty() => None,
                    Ok(event) => Some(
                        serde_json::from_str::<ChatCompletionChunk>(&event.data)
                            .map_err(|e| LlmError::Malformed(format!("invalid chunk: {e}"))),
                    ),
                    Err(e) => Some(Err(stream_error(e))),
                })
            });

        Ok(Box::pin(chunks))
    }

    async fn chat_completion(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let response = self.send(messages, false).await?;

        let body: ChatCompletionResponse = response.json().await.map_err(|e| LlmError::from_reqwest(&e))?;

        body.into_text()
            .ok_or_else(|| LlmError::Malformed("response contained no choices".to_owned()))
    }

    /// Drop the pooled client; requests still in flight keep their own handle
    fn close(&self) {
        let closed = match self.http.write() {
            Ok(mut http) => http.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if closed.is_some() {
            tracing::info!(url = %self.endpoint.url(), "upstream client closed");
        }
    }
}
