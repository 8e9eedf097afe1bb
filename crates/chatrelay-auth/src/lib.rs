//! Upstream credential resolution for chatrelay
//!
//! Resolves, once per process, either a static API key or a caching
//! bearer-token provider for the Cognitive Services scope.

#![allow(clippy::must_use_candidate)]

mod azure_cli;
mod chain;
mod credential;
mod environment;
mod error;
mod managed_identity;
mod token;

pub use azure_cli::AzureCliCredential;
pub use chain::ChainedTokenCredential;
pub use credential::{Authorization, Credential, LOCAL_PLACEHOLDER_KEY, resolve};
pub use environment::EnvironmentCredential;
pub use error::AuthError;
pub use managed_identity::ManagedIdentityCredential;
pub use token::{AccessToken, REFRESH_MARGIN, TokenCredential, TokenProvider};

/// Scope requested for Azure OpenAI bearer tokens
pub const COGNITIVE_SERVICES_SCOPE: &str = "https://cognitiveservices.azure.com/.default";

/// Resource URI for v1 token endpoints (scope without `/.default`)
pub(crate) fn scope_to_resource(scope: &str) -> &str {
    scope.strip_suffix("/.default").unwrap_or(scope)
}
