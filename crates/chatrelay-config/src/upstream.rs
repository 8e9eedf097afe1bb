use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Default Azure OpenAI deployment name
pub const DEFAULT_DEPLOYMENT: &str = "chatgpt";

/// Default Azure OpenAI data-plane API version
pub const DEFAULT_API_VERSION: &str = "2024-02-01";

/// Default overall timeout for one upstream call
pub const DEFAULT_TIMEOUT: &str = "30s";

/// The single chat-completion deployment this process talks to
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Azure OpenAI resource endpoint (e.g. `https://my-resource.openai.azure.com`)
    #[serde(default)]
    pub endpoint: Option<Url>,
    /// Deployment name, sent as the model
    #[serde(default = "default_deployment")]
    pub deployment: String,
    /// Azure OpenAI `api-version` query parameter
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Static API key; takes precedence over identity-based auth
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Client ID of a user-assigned managed identity
    #[serde(default)]
    pub managed_identity_client_id: Option<String>,
    /// OpenAI-compatible local server (e.g. llamafile); bypasses cloud auth
    #[serde(default)]
    pub local_endpoint: Option<Url>,
    /// Overall timeout for one upstream call (e.g. "30s", "2m")
    #[serde(default = "default_timeout")]
    pub timeout: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            deployment: default_deployment(),
            api_version: default_api_version(),
            api_key: None,
            managed_identity_client_id: None,
            local_endpoint: None,
            timeout: default_timeout(),
        }
    }
}

impl UpstreamConfig {
    /// Parsed upstream timeout
    ///
    /// # Errors
    ///
    /// Returns an error if `timeout` is not a valid duration string
    pub fn timeout(&self) -> anyhow::Result<Duration> {
        duration_str::parse(&self.timeout)
            .map_err(|e| anyhow::anyhow!("invalid upstream.timeout '{}': {e}", self.timeout))
    }
}

fn default_deployment() -> String {
    DEFAULT_DEPLOYMENT.to_owned()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_owned()
}

fn default_timeout() -> String {
    DEFAULT_TIMEOUT.to_owned()
}
