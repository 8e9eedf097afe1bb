//! Request types accepted by the chat endpoint

pub mod message;
pub mod request;

pub use message::{ChatMessage, Role};
pub use request::ChatRequest;
