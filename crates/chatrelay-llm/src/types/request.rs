use serde::Deserialize;

use super::ChatMessage;
use crate::error::LlmError;

/// Body of `POST /chat`
///
/// Either a single user message, wrapped into a conversation by the prompt
/// builder, or a full history supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatRequest {
    Single(String),
    History(Vec<ChatMessage>),
}

#[derive(Debug, Deserialize)]
struct RawChatRequest {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    messages: Option<Vec<ChatMessage>>,
}

impl ChatRequest {
    /// Parse and validate a request body
    ///
    /// `messages` wins when both fields are present.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::InvalidRequest` when the body is not JSON, has the
    /// wrong shape, or carries neither field
    pub fn from_json(body: &[u8]) -> Result<Self, LlmError> {
        let raw: RawChatRequest = serde_json::from_slice(body)
            .map_err(|e| LlmError::InvalidRequest(format!("malformed request body: {e}")))?;

        match (raw.messages, raw.message) {
            (Some(messages), _) => Ok(Self::History(messages)),
            (None, Some(message)) => Ok(Self::Single(message)),
            (None, None) => Err(LlmError::InvalidRequest(
                "request body must contain `message` or `messages`".to_owned(),
            )),
        }
    }
}
