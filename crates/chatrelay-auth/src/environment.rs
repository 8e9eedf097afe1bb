use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use crate::AuthError;
use crate::token::{AccessToken, TokenCredential};

const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Service principal credential from `AZURE_TENANT_ID`, `AZURE_CLIENT_ID`
/// and `AZURE_CLIENT_SECRET`
#[derive(Debug)]
pub struct EnvironmentCredential {
    http: reqwest::Client,
    token_url: Url,
    client_id: String,
    client_secret: SecretString,
}

#[derive(Debug, Deserialize)]
struct ClientCredentialsToken {
    access_token: String,
    expires_in: u64,
}

impl EnvironmentCredential {
    /// Build from environment variables
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unavailable` when any of the variables is missing
    pub fn from_env() -> Result<Self, AuthError> {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|value| !value.is_empty())
                .ok_or_else(|| AuthError::Unavailable {
                    source_name: "environment",
                    reason: format!("{name} is not set"),
                })
        };

        let tenant_id = read("AZURE_TENANT_ID")?;
        let client_id = read("AZURE_CLIENT_ID")?;
        let client_secret = read("AZURE_CLIENT_SECRET")?;
        let authority = std::env::var("AZURE_AUTHORITY_HOST").unwrap_or_else(|_| DEFAULT_AUTHORITY.to_owned());

        Self::new(&authority, &tenant_id, client_id, SecretString::from(client_secret))
    }

    /// Build for an explicit authority and tenant
    ///
    /// # Errors
    ///
    /// Returns an error if the token URL is invalid or the HTTP client cannot be built
    pub fn new(
        authority: &str,
        tenant_id: &str,
        client_id: String,
        client_secret: SecretString,
    ) -> Result<Self, AuthError> {
        let base = authority.trim_end_matches('/');
        let token_url = Url::parse(&format!("{base}/{tenant_id}/oauth2/v2.0/token"))
            .map_err(|e| AuthError::InvalidResponse(format!("invalid authority host: {e}")))?;

        let http = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            http,
            token_url,
            client_id,
            client_secret,
        })
    }
}

#[async_trait]
impl TokenCredential for EnvironmentCredential {
    fn name(&self) -> &'static str {
        "environment"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken, AuthError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("scope", scope),
        ];

        let response = self.http.post(self.token_url.clone()).form(&form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AuthError::Endpoint {
                status: status.as_u16(),
                message,
            });
        }

        let token: ClientCredentialsToken = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        Ok(AccessToken::expiring_in(
            SecretString::from(token.access_token),
            token.expires_in,
        ))
    }
}
