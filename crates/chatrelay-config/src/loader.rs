use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::env;
use crate::{Config, MESSAGE_PLACEHOLDER};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing, or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded = env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Build configuration from the deployment's environment variables
    ///
    /// Used when no configuration file is given. Empty variables are
    /// treated as unset.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds an unparseable value or the
    /// result fails validation
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        config.upstream.local_endpoint = env::var("LOCAL_OPENAI_ENDPOINT")
            .map(|raw| parse_url("LOCAL_OPENAI_ENDPOINT", &raw))
            .transpose()?;
        config.upstream.endpoint = env::var("AZURE_OPENAI_ENDPOINT")
            .map(|raw| parse_url("AZURE_OPENAI_ENDPOINT", &raw))
            .transpose()?;
        config.upstream.api_key = env::var("AZURE_OPENAI_KEY").map(SecretString::from);
        config.upstream.managed_identity_client_id = env::var("AZURE_OPENAI_CLIENT_ID");

        if let Some(deployment) = env::var("AZURE_OPENAI_CHATGPT_DEPLOYMENT") {
            config.upstream.deployment = deployment;
        }
        if let Some(api_version) = env::var("AZURE_OPENAI_API_VERSION") {
            config.upstream.api_version = api_version;
        }
        if let Some(timeout) = env::var("CHATRELAY_UPSTREAM_TIMEOUT") {
            config.upstream.timeout = timeout;
        }
        if let Some(mode) = env::var("CHATRELAY_CHAT_MODE") {
            config.chat.mode = mode.parse()?;
        }
        if let Some(prompt) = env::var("CHATRELAY_SYSTEM_PROMPT") {
            config.chat.system_prompt = prompt;
        }

        config.validate()?;

        Ok(config)
    }

    /// Default log filter for this deployment
    ///
    /// Production deployments (`RUNNING_IN_PRODUCTION` set) log at `info`,
    /// everything else at `debug`.
    pub fn default_log_filter() -> &'static str {
        if env::var("RUNNING_IN_PRODUCTION").is_some() {
            "info"
        } else {
            "debug"
        }
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error describing the first inconsistency found
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_upstream()?;
        self.validate_chat()?;
        self.validate_server()?;
        Ok(())
    }

    fn validate_upstream(&self) -> anyhow::Result<()> {
        let upstream = &self.upstream;

        if upstream.endpoint.is_none() && upstream.local_endpoint.is_none() {
            anyhow::bail!("upstream.endpoint (AZURE_OPENAI_ENDPOINT) is required unless a local endpoint is configured");
        }

        if upstream.deployment.trim().is_empty() {
            anyhow::bail!("upstream.deployment must not be empty");
        }

        if upstream.api_key.as_ref().is_some_and(|key| key.expose_secret().is_empty()) {
            anyhow::bail!("upstream.api_key must not be empty when set");
        }

        if upstream.timeout()?.is_zero() {
            anyhow::bail!("upstream.timeout must be greater than zero");
        }

        Ok(())
    }

    fn validate_chat(&self) -> anyhow::Result<()> {
        if let Some(ref template) = self.chat.message_template
            && !template.contains(MESSAGE_PLACEHOLDER)
        {
            anyhow::bail!("chat.message_template must contain the {MESSAGE_PLACEHOLDER} placeholder");
        }

        Ok(())
    }

    fn validate_server(&self) -> anyhow::Result<()> {
        if let Some(ref cors) = self.server.cors {
            if cors.credentials && cors.allows_any_origin() {
                anyhow::bail!("server.cors.credentials cannot be combined with a wildcard origin");
            }
            cors.max_age()?;
        }

        if !self.server.health.path.starts_with('/') {
            anyhow::bail!("server.health.path must start with '/'");
        }

        Ok(())
    }
}

fn parse_url(name: &str, raw: &str) -> anyhow::Result<Url> {
    Url::parse(raw.trim()).map_err(|e| anyhow::anyhow!("{name} is not a valid URL: {e}"))
}
