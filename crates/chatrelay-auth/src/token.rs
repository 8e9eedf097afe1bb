use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::Mutex;

use crate::AuthError;

/// Tokens are refreshed this long before they expire
pub const REFRESH_MARGIN: Duration = Duration::from_secs(300);

/// Bearer token with its expiry
#[derive(Clone)]
pub struct AccessToken {
    /// Raw bearer token
    pub secret: SecretString,
    /// Absolute expiry time
    pub expires_at: SystemTime,
}

impl AccessToken {
    pub const fn new(secret: SecretString, expires_at: SystemTime) -> Self {
        Self { secret, expires_at }
    }

    /// Token that expires `seconds` from now
    pub fn expiring_in(secret: SecretString, seconds: u64) -> Self {
        Self::new(secret, SystemTime::now() + Duration::from_secs(seconds))
    }

    /// Token that expires at a Unix timestamp
    pub fn expiring_at_unix(secret: SecretString, unix_seconds: u64) -> Self {
        Self::new(secret, UNIX_EPOCH + Duration::from_secs(unix_seconds))
    }

    /// Whether the token expires within `margin`
    pub fn needs_refresh(&self, margin: Duration) -> bool {
        self.expires_at
            .duration_since(SystemTime::now())
            .map_or(true, |remaining| remaining <= margin)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// A source of bearer tokens for a scope
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    /// Acquire a new token for `scope`
    async fn get_token(&self, scope: &str) -> Result<AccessToken, AuthError>;
}

/// Caching token provider bound to one scope
///
/// Safe to share across request tasks. Concurrent callers that find the
/// cached token near expiry wait on the same refresh rather than each
/// hitting the identity endpoint.
pub struct TokenProvider {
    credential: Arc<dyn TokenCredential>,
    scope: String,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenProvider {
    pub fn new(credential: Arc<dyn TokenCredential>, scope: impl Into<String>) -> Self {
        Self {
            credential,
            scope: scope.into(),
            cached: Mutex::new(None),
        }
    }

    /// Name of the underlying credential source
    pub fn source(&self) -> &'static str {
        self.credential.name()
    }

    /// Scope tokens are requested for
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Return a bearer token valid for at least [`REFRESH_MARGIN`]
    ///
    /// # Errors
    ///
    /// Returns the credential source's error when a refresh is needed and fails
    pub async fn token(&self) -> Result<SecretString, AuthError> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref()
            && !token.needs_refresh(REFRESH_MARGIN)
        {
            return Ok(token.secret.clone());
        }

        let fresh = self.credential.get_token(&self.scope).await?;
        tracing::debug!(
            source = self.credential.name(),
            scope = %self.scope,
            "acquired bearer token"
        );

        let secret = fresh.secret.clone();
        *cached = Some(fresh);
        Ok(secret)
    }
}

impl std::fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenProvider")
            .field("source", &self.credential.name())
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}
