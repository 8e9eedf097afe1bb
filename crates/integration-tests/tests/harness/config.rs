//! Programmatic configuration builder for integration tests

use std::net::SocketAddr;

use chatrelay_config::{ChatConfig, Config, CorsConfig, ExampleMessage, ResponseMode, ServerConfig, UpstreamConfig};
use secrecy::SecretString;

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with minimal defaults
    pub fn new() -> Self {
        Self {
            config: Config {
                server: ServerConfig {
                    listen_address: Some(SocketAddr::from(([127, 0, 0, 1], 0))),
                    ..ServerConfig::default()
                },
                upstream: UpstreamConfig::default(),
                chat: ChatConfig::default(),
                telemetry: None,
            },
        }
    }

    /// Point at a mock Azure resource endpoint with a static key
    pub fn with_azure_upstream(mut self, endpoint: &str) -> Self {
        self.config.upstream.endpoint = Some(endpoint.parse().expect("valid URL"));
        self.config.upstream.api_key = Some(SecretString::from("test-key"));
        self
    }

    /// Point at a mock Azure resource endpoint without any key
    pub fn with_keyless_azure_upstream(mut self, endpoint: &str) -> Self {
        self.config.upstream.endpoint = Some(endpoint.parse().expect("valid URL"));
        self
    }

    /// Point at a mock OpenAI-compatible local server
    pub fn with_local_upstream(mut self, base_url: &str) -> Self {
        self.config.upstream.local_endpoint = Some(base_url.parse().expect("valid URL"));
        self
    }

    pub fn with_deployment(mut self, deployment: &str) -> Self {
        deployment.clone_into(&mut self.config.upstream.deployment);
        self
    }

    pub fn with_timeout(mut self, timeout: &str) -> Self {
        timeout.clone_into(&mut self.config.upstream.timeout);
        self
    }

    pub fn with_mode(mut self, mode: ResponseMode) -> Self {
        self.config.chat.mode = mode;
        self
    }

    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        prompt.clone_into(&mut self.config.chat.system_prompt);
        self
    }

    pub fn with_message_template(mut self, template: &str) -> Self {
        self.config.chat.message_template = Some(template.to_owned());
        self
    }

    pub fn with_examples(mut self, examples: Vec<ExampleMessage>) -> Self {
        self.config.chat.examples = examples;
        self
    }

    pub fn without_system_prompt_injection(mut self) -> Self {
        self.config.chat.inject_system_prompt = false;
        self
    }

    /// Set CORS configuration
    pub fn with_cors(mut self, config: CorsConfig) -> Self {
        self.config.server.cors = Some(config);
        self
    }

    /// Disable health endpoint
    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config.validate().expect("test config must be valid");
        self.config
    }
}
