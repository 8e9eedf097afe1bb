use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use crate::token::{AccessToken, TokenCredential};
use crate::{AuthError, scope_to_resource};

const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
const IMDS_API_VERSION: &str = "2018-02-01";
const APP_SERVICE_API_VERSION: &str = "2019-08-01";

/// Where the managed identity token comes from
#[derive(Debug, Clone)]
enum IdentityEndpoint {
    /// App Service / Functions local identity endpoint
    AppService { endpoint: Url, header: SecretString },
    /// Azure Instance Metadata Service
    Imds { endpoint: Url },
}

/// Managed identity credential, optionally bound to a user-assigned client ID
#[derive(Debug)]
pub struct ManagedIdentityCredential {
    http: reqwest::Client,
    endpoint: IdentityEndpoint,
    client_id: Option<String>,
}

impl ManagedIdentityCredential {
    /// Detect the hosting environment
    ///
    /// Uses the App Service identity endpoint when `IDENTITY_ENDPOINT` and
    /// `IDENTITY_HEADER` are set, otherwise IMDS.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or
    /// `IDENTITY_ENDPOINT` is not a URL
    pub fn from_env(client_id: Option<String>) -> Result<Self, AuthError> {
        let app_service = std::env::var("IDENTITY_ENDPOINT")
            .ok()
            .zip(std::env::var("IDENTITY_HEADER").ok());

        match app_service {
            Some((endpoint, header)) => {
                let endpoint = Url::parse(&endpoint).map_err(|e| AuthError::Unavailable {
                    source_name: "managed_identity",
                    reason: format!("IDENTITY_ENDPOINT is not a URL: {e}"),
                })?;
                Self::app_service(endpoint, SecretString::from(header), client_id)
            }
            None => Self::imds(None, client_id),
        }
    }

    /// Credential against an App Service style identity endpoint
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn app_service(endpoint: Url, header: SecretString, client_id: Option<String>) -> Result<Self, AuthError> {
        Ok(Self {
            http: build_client()?,
            endpoint: IdentityEndpoint::AppService { endpoint, header },
            client_id,
        })
    }

    /// Credential against IMDS, or an IMDS-compatible endpoint when given
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn imds(endpoint: Option<Url>, client_id: Option<String>) -> Result<Self, AuthError> {
        let endpoint = match endpoint {
            Some(endpoint) => endpoint,
            None => Url::parse(IMDS_ENDPOINT).map_err(|e| AuthError::InvalidResponse(e.to_string()))?,
        };

        Ok(Self {
            http: build_client()?,
            endpoint: IdentityEndpoint::Imds { endpoint },
            client_id,
        })
    }
}

fn build_client() -> Result<reqwest::Client, AuthError> {
    // IMDS is unreachable off-Azure; fail fast so the chain can move on
    Ok(reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(2))
        .timeout(Duration::from_secs(10))
        .build()?)
}

/// Token payload shared by IMDS and App Service
#[derive(Debug, Deserialize)]
struct ManagedIdentityToken {
    access_token: String,
    expires_on: ExpiresOn,
}

/// `expires_on` arrives as a string on some hosts and a number on others
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExpiresOn {
    Number(u64),
    Text(String),
}

impl ExpiresOn {
    fn unix_seconds(&self) -> Result<u64, AuthError> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| AuthError::InvalidResponse(format!("unparseable expires_on '{s}'"))),
        }
    }
}

#[async_trait]
impl TokenCredential for ManagedIdentityCredential {
    fn name(&self) -> &'static str {
        "managed_identity"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken, AuthError> {
        let resource = scope_to_resource(scope);

        let request = match &self.endpoint {
            IdentityEndpoint::AppService { endpoint, header } => self
                .http
                .get(endpoint.clone())
                .query(&[("api-version", APP_SERVICE_API_VERSION), ("resource", resource)])
                .header("X-IDENTITY-HEADER", header.expose_secret()),
            IdentityEndpoint::Imds { endpoint } => self
                .http
                .get(endpoint.clone())
                .query(&[("api-version", IMDS_API_VERSION), ("resource", resource)])
                .header("Metadata", "true"),
        };

        let request = match &self.client_id {
            Some(client_id) => request.query(&[("client_id", client_id.as_str())]),
            None => request,
        };

        let response = request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                AuthError::Unavailable {
                    source_name: "managed_identity",
                    reason: e.to_string(),
                }
            } else {
                AuthError::Request(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AuthError::Endpoint {
                status: status.as_u16(),
                message,
            });
        }

        let token: ManagedIdentityToken = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        Ok(AccessToken::expiring_at_unix(
            SecretString::from(token.access_token),
            token.expires_on.unix_seconds()?,
        ))
    }
}
