use chatrelay_auth::AuthError;
use chatrelay_core::HttpError;
use http::StatusCode;
use thiserror::Error;

/// Errors that can occur while talking to the upstream
#[derive(Debug, Error)]
pub enum LlmError {
    /// Client sent a malformed or invalid request
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The upstream call exceeded its overall timeout
    #[error("timeout")]
    Timeout,

    /// Connection to the upstream failed
    #[error("upstream connection failed: {0}")]
    Transport(String),

    /// Upstream answered with a non-success status
    #[error("upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Upstream throttled the request
    #[error("upstream rate limit exceeded: {message}")]
    RateLimited { message: String },

    /// Upstream sent a payload that could not be decoded
    #[error("malformed upstream response: {0}")]
    Malformed(String),

    /// Error while reading the event stream
    #[error("streaming error: {0}")]
    Streaming(String),

    /// No usable credential for the upstream call
    #[error("credential error: {0}")]
    Credential(#[from] AuthError),

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl LlmError {
    pub(crate) fn from_reqwest(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_decode() {
            Self::Malformed(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

impl HttpError for LlmError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Transport(_) | Self::Upstream { .. } | Self::Malformed(_) | Self::Streaming(_) | Self::Credential(_) => {
                StatusCode::BAD_GATEWAY
            }
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::InvalidRequest(_) => "invalid_request_error",
            Self::Timeout => "timeout_error",
            Self::Transport(_) => "connection_error",
            Self::Upstream { .. } => "upstream_error",
            Self::RateLimited { .. } => "rate_limit_error",
            Self::Malformed(_) => "malformed_response_error",
            Self::Streaming(_) => "streaming_error",
            Self::Credential(_) => "authentication_error",
            Self::Internal(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Internal(_) => "an internal error occurred".to_owned(),
            // Token endpoint bodies stay in the logs
            Self::Credential(_) => "credential error: upstream token unavailable".to_owned(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_displays_bare_word() {
        assert_eq!(LlmError::Timeout.to_string(), "timeout");
    }

    #[test]
    fn internal_details_are_hidden_from_clients() {
        let err = LlmError::Internal("encoder blew up".to_owned());
        assert_eq!(err.client_message(), "an internal error occurred");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn token_endpoint_details_are_hidden_from_clients() {
        let err = LlmError::from(AuthError::Endpoint {
            status: 400,
            message: "AADSTS700016: application not found in tenant".to_owned(),
        });
        assert!(err.to_string().contains("AADSTS700016"));
        assert_eq!(err.client_message(), "credential error: upstream token unavailable");
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn upstream_status_maps_to_bad_gateway() {
        let err = LlmError::Upstream {
            status: 401,
            message: "Access denied".to_owned(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.to_string(), "upstream returned 401: Access denied");
    }
}
