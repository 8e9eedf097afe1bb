//! Conversation assembly for outgoing requests

use chatrelay_config::{ChatConfig, ExampleRole, MESSAGE_PLACEHOLDER};

use crate::types::{ChatMessage, ChatRequest};

/// Builds the message list sent upstream for each request
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system_prompt: String,
    inject_system_prompt: bool,
    message_template: Option<String>,
    examples: Vec<ChatMessage>,
}

impl PromptBuilder {
    pub fn from_config(config: &ChatConfig) -> Self {
        let examples = config
            .examples
            .iter()
            .map(|example| match example.role {
                ExampleRole::User => ChatMessage::user(example.content.clone()),
                ExampleRole::Assistant => ChatMessage::assistant(example.content.clone()),
            })
            .collect();

        Self {
            system_prompt: config.system_prompt.clone(),
            inject_system_prompt: config.inject_system_prompt,
            message_template: config.message_template.clone(),
            examples,
        }
    }

    /// Produce the upstream conversation
    ///
    /// A single message becomes system prompt, few-shot examples, then the
    /// (templated) user turn. A caller-supplied history is forwarded in order,
    /// behind the system prompt and examples only when injection is enabled.
    pub fn build(&self, request: ChatRequest) -> Vec<ChatMessage> {
        match request {
            ChatRequest::Single(message) => {
                let mut messages = self.preamble();
                messages.push(ChatMessage::user(self.apply_template(&message)));
                messages
            }
            ChatRequest::History(history) if self.inject_system_prompt => {
                let mut messages = self.preamble();
                messages.extend(history);
                messages
            }
            ChatRequest::History(history) => history,
        }
    }

    fn preamble(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.examples.len() + 2);
        messages.push(ChatMessage::system(self.system_prompt.clone()));
        messages.extend(self.examples.iter().cloned());
        messages
    }

    fn apply_template(&self, message: &str) -> String {
        match self.message_template {
            Some(ref template) => template.replace(MESSAGE_PLACEHOLDER, message),
            None => message.to_owned(),
        }
    }
}
