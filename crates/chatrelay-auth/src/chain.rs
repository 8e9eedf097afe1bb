use std::sync::Arc;

use async_trait::async_trait;

use crate::token::{AccessToken, TokenCredential};
use crate::{AuthError, AzureCliCredential, EnvironmentCredential, ManagedIdentityCredential};

/// Tries each credential in order; the first token wins
pub struct ChainedTokenCredential {
    sources: Vec<Arc<dyn TokenCredential>>,
}

impl ChainedTokenCredential {
    pub fn new(sources: Vec<Arc<dyn TokenCredential>>) -> Self {
        Self { sources }
    }

    /// Ambient credential chain: service principal environment variables,
    /// then managed identity, then the Azure CLI
    ///
    /// # Errors
    ///
    /// Returns an error if the managed identity HTTP client cannot be built
    pub fn default_chain() -> Result<Self, AuthError> {
        let mut sources: Vec<Arc<dyn TokenCredential>> = Vec::new();

        match EnvironmentCredential::from_env() {
            Ok(credential) => sources.push(Arc::new(credential)),
            Err(e) => tracing::debug!(error = %e, "skipping environment credential"),
        }

        sources.push(Arc::new(ManagedIdentityCredential::from_env(None)?));
        sources.push(Arc::new(AzureCliCredential::default()));

        Ok(Self::new(sources))
    }
}

#[async_trait]
impl TokenCredential for ChainedTokenCredential {
    fn name(&self) -> &'static str {
        "default_chain"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken, AuthError> {
        let mut failures = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            match source.get_token(scope).await {
                Ok(token) => {
                    tracing::debug!(source = source.name(), "credential chain resolved");
                    return Ok(token);
                }
                Err(e) => {
                    tracing::debug!(source = source.name(), error = %e, "credential source failed");
                    failures.push(format!("{}: {e}", source.name()));
                }
            }
        }

        Err(AuthError::NoCredential(failures.join("; ")))
    }
}
