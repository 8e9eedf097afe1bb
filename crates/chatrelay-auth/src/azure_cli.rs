use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::Deserialize;
use tokio::process::Command;

use crate::token::{AccessToken, TokenCredential};
use crate::{AuthError, scope_to_resource};

/// Used when the CLI output lacks a machine-readable expiry
const FALLBACK_LIFETIME_SECS: u64 = 600;

/// Signed-in Azure CLI user (`az login`)
#[derive(Debug)]
pub struct AzureCliCredential {
    program: String,
    timeout: Duration,
}

impl Default for AzureCliCredential {
    fn default() -> Self {
        Self {
            program: if cfg!(windows) { "az.cmd" } else { "az" }.to_owned(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
    /// Unix seconds, present in az >= 2.54
    #[serde(default, rename = "expires_on")]
    expires_on: Option<u64>,
}

impl CliToken {
    fn into_access_token(self) -> AccessToken {
        let secret = SecretString::from(self.access_token);
        match self.expires_on {
            Some(unix) => AccessToken::expiring_at_unix(secret, unix),
            None => AccessToken::expiring_in(secret, FALLBACK_LIFETIME_SECS),
        }
    }
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    fn name(&self) -> &'static str {
        "azure_cli"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken, AuthError> {
        let resource = scope_to_resource(scope);

        let output = Command::new(&self.program)
            .args(["account", "get-access-token", "--output", "json", "--resource", resource])
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| AuthError::Cli("timed out waiting for az".to_owned()))?
            .map_err(|e| AuthError::Unavailable {
                source_name: "azure_cli",
                reason: format!("could not run {}: {e}", self.program),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AuthError::Cli(stderr.trim().to_owned()));
        }

        let token: CliToken =
            serde_json::from_slice(&output.stdout).map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        Ok(token.into_access_token())
    }
}
