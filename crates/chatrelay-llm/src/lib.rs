//! Chat relay to a single Azure OpenAI (or OpenAI-compatible) deployment
//!
//! Accepts a message or a conversation on `POST /chat`, forwards it upstream
//! with the configured system prompt, and relays the upstream's streamed
//! chunks to the client as newline-delimited JSON.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod client;
pub mod error;
pub mod handler;
pub mod prompt;
pub mod protocol;
pub mod relay;
pub mod types;

pub use client::{ChatBackend, ChunkStream, Endpoint, UpstreamClient};
pub use error::LlmError;
pub use handler::{ChatState, chat_router};
pub use prompt::PromptBuilder;
pub use protocol::openai::ChatCompletionChunk;
pub use relay::{JSON_LINES_CONTENT_TYPE, relay};
pub use types::{ChatMessage, ChatRequest, Role};
