use std::time::Duration;

use serde::Deserialize;

/// CORS configuration for the chat page and API
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins; a single `"*"` entry allows any origin
    #[serde(default = "default_origins")]
    pub origins: Vec<String>,
    /// Allow credentials (cookies, App Service auth headers)
    #[serde(default)]
    pub credentials: bool,
    /// Preflight cache lifetime (e.g. "10m")
    #[serde(default)]
    pub max_age: Option<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: default_origins(),
            credentials: false,
            max_age: None,
        }
    }
}

impl CorsConfig {
    /// Whether every origin is allowed
    pub fn allows_any_origin(&self) -> bool {
        self.origins.iter().any(|origin| origin == "*")
    }

    /// Parsed preflight cache lifetime
    ///
    /// # Errors
    ///
    /// Returns an error if `max_age` is not a valid duration string
    pub fn max_age(&self) -> anyhow::Result<Option<Duration>> {
        self.max_age
            .as_deref()
            .map(|raw| duration_str::parse(raw).map_err(|e| anyhow::anyhow!("invalid cors.max_age '{raw}': {e}")))
            .transpose()
    }
}

fn default_origins() -> Vec<String> {
    vec!["*".to_owned()]
}
