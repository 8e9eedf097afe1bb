use std::sync::Arc;

use chatrelay_config::UpstreamConfig;
use secrecy::{ExposeSecret, SecretString};

use crate::token::{TokenCredential, TokenProvider};
use crate::{AuthError, COGNITIVE_SERVICES_SCOPE, ChainedTokenCredential, ManagedIdentityCredential};

/// Placeholder key sent to local OpenAI-compatible servers
pub const LOCAL_PLACEHOLDER_KEY: &str = "no-key-required";

/// Credential attached to every upstream call
#[derive(Clone, Debug)]
pub enum Credential {
    /// Sent verbatim on every call
    ApiKey(SecretString),
    /// Bearer tokens fetched (and refreshed) on demand
    Token(Arc<TokenProvider>),
}

/// How an outgoing request should be authorized
#[derive(Debug)]
pub enum Authorization {
    /// Azure `api-key` header
    ApiKey(SecretString),
    /// `Authorization: Bearer` header
    Bearer(SecretString),
}

impl Credential {
    /// Wrap a token source for the Cognitive Services scope
    pub fn token(credential: Arc<dyn TokenCredential>) -> Self {
        Self::Token(Arc::new(TokenProvider::new(credential, COGNITIVE_SERVICES_SCOPE)))
    }

    /// Short description for startup logs
    pub fn describe(&self) -> &'static str {
        match self {
            Self::ApiKey(_) => "api_key",
            Self::Token(provider) => provider.source(),
        }
    }

    /// Produce the authorization for one request
    ///
    /// # Errors
    ///
    /// Returns an error when a token refresh is needed and fails
    pub async fn authorization(&self) -> Result<Authorization, AuthError> {
        match self {
            Self::ApiKey(key) => Ok(Authorization::ApiKey(key.clone())),
            Self::Token(provider) => provider.token().await.map(Authorization::Bearer),
        }
    }
}

/// Resolve the upstream credential once at startup
///
/// Precedence: local endpoint override, then a static API key, then a
/// managed identity bound to the configured client ID, then the default
/// credential chain. Token credentials are exercised immediately so an
/// unusable chain fails here instead of on the first request.
///
/// # Errors
///
/// Returns an error if no credential path yields a token
pub async fn resolve(config: &UpstreamConfig) -> Result<Credential, AuthError> {
    if let Some(ref local) = config.local_endpoint {
        tracing::info!(endpoint = %local, "using local OpenAI-compatible endpoint without cloud auth");
        return Ok(Credential::ApiKey(SecretString::from(LOCAL_PLACEHOLDER_KEY)));
    }

    if let Some(ref key) = config.api_key
        && !key.expose_secret().is_empty()
    {
        tracing::info!("using static API key for upstream");
        return Ok(Credential::ApiKey(key.clone()));
    }

    let source: Arc<dyn TokenCredential> = match config.managed_identity_client_id {
        Some(ref client_id) => {
            tracing::info!(client_id = %client_id, "using user-assigned managed identity for upstream");
            Arc::new(ManagedIdentityCredential::from_env(Some(client_id.clone()))?)
        }
        None => {
            tracing::info!("using default credential chain for upstream");
            Arc::new(ChainedTokenCredential::default_chain()?)
        }
    };

    let credential = Credential::token(source);
    credential.authorization().await?;

    Ok(credential)
}
