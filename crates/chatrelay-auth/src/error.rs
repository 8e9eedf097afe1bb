/// Credential resolution and token acquisition errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No credential source in the chain produced a token
    #[error("no usable credential: {0}")]
    NoCredential(String),

    /// A credential source does not apply to this environment
    #[error("{source_name} unavailable: {reason}")]
    Unavailable {
        /// Credential source name
        source_name: &'static str,
        /// Why it was skipped
        reason: String,
    },

    /// HTTP request to a token endpoint failed
    #[error("token request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Token endpoint returned a non-success response
    #[error("token endpoint error ({status}): {message}")]
    Endpoint {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// Token response could not be understood
    #[error("invalid token response: {0}")]
    InvalidResponse(String),

    /// Azure CLI invocation failed
    #[error("azure cli failed: {0}")]
    Cli(String),
}
