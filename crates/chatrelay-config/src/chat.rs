use serde::Deserialize;

/// Placeholder replaced by the incoming message in `message_template`
pub const MESSAGE_PLACEHOLDER: &str = "{message}";

/// Default system prompt
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// How the chat endpoint answers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Newline-delimited JSON chunks, relayed as they arrive
    #[default]
    Stream,
    /// One accumulated `{"response": ...}` object
    Single,
}

impl ResponseMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stream => "stream",
            Self::Single => "single",
        }
    }
}

impl std::str::FromStr for ResponseMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stream" | "streaming" => Ok(Self::Stream),
            "single" | "json" => Ok(Self::Single),
            other => anyhow::bail!("unknown chat mode '{other}', expected 'stream' or 'single'"),
        }
    }
}

/// Prompt construction for outgoing conversations
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfig {
    /// Response shape of `POST /chat`
    #[serde(default)]
    pub mode: ResponseMode,
    /// System prompt placed first in every conversation
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Prepend the system prompt to caller-supplied histories
    #[serde(default = "default_inject")]
    pub inject_system_prompt: bool,
    /// Template wrapping a single `{"message": ...}` request; must contain `{message}`
    #[serde(default)]
    pub message_template: Option<String>,
    /// Few-shot turns inserted after the system prompt
    #[serde(default)]
    pub examples: Vec<ExampleMessage>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            mode: ResponseMode::default(),
            system_prompt: default_system_prompt(),
            inject_system_prompt: default_inject(),
            message_template: None,
            examples: Vec::new(),
        }
    }
}

/// One few-shot turn
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExampleMessage {
    pub role: ExampleRole,
    pub content: String,
}

/// Roles allowed in few-shot examples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExampleRole {
    User,
    Assistant,
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_owned()
}

#[allow(clippy::missing_const_for_fn)]
fn default_inject() -> bool {
    true
}
