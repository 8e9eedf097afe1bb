//! `OpenAI` chat completion API wire format types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::ChatMessage;

/// Marker the upstream sends as the final SSE payload
pub const DONE_MARKER: &str = "[DONE]";

// -- Request types --

/// Outgoing chat completion request
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    /// Deployment or model identifier
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

// -- Response types --

/// Non-streaming chat completion response
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ResponseChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseChoice {
    pub message: ResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// Text of the first choice, if any
    pub fn into_text(self) -> Option<String> {
        self.choices.into_iter().next().map(|choice| choice.message.content.unwrap_or_default())
    }
}

// -- Streaming types --

/// One `chat.completion.chunk` exactly as delivered by the upstream
///
/// The object is kept as received and serialized back unchanged: no field is
/// added, dropped or defaulted, whatever the provider puts in it (Azure
/// content filter results, `usage: null`, `delta: null`, ...), and keys keep
/// their upstream order. Only a JSON object is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatCompletionChunk(Map<String, Value>);

impl ChatCompletionChunk {
    /// Content fragment of the first choice
    pub fn content(&self) -> Option<&str> {
        self.0
            .get("choices")?
            .as_array()?
            .first()?
            .get("delta")?
            .get("content")?
            .as_str()
    }
}

/// Error envelope returned by OpenAI-compatible APIs on non-2xx responses
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: Option<Value>,
}
