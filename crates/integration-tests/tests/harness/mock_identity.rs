//! Mock IMDS-style managed identity token endpoint

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde_json::json;
use tokio_util::sync::CancellationToken;

pub const TOKEN_PATH: &str = "/metadata/identity/oauth2/token";

/// Mock identity endpoint issuing numbered tokens
pub struct MockIdentity {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<IdentityState>,
}

struct IdentityState {
    issued: AtomicU32,
    lifetime_secs: u64,
    queries: Mutex<Vec<std::collections::HashMap<String, String>>>,
}

impl MockIdentity {
    /// Start the mock; tokens expire `lifetime_secs` after issue
    pub async fn start(lifetime_secs: u64) -> anyhow::Result<Self> {
        let state = Arc::new(IdentityState {
            issued: AtomicU32::new(0),
            lifetime_secs,
            queries: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route(TOKEN_PATH, routing::get(issue_token))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Full token URL, as passed to an IMDS credential
    pub fn token_url(&self) -> String {
        format!("http://{}{TOKEN_PATH}", self.addr)
    }

    /// Number of tokens issued so far
    pub fn issued(&self) -> u32 {
        self.state.issued.load(Ordering::SeqCst)
    }

    /// Query parameters of every token request
    pub fn queries(&self) -> Vec<std::collections::HashMap<String, String>> {
        self.state.queries.lock().unwrap().clone()
    }
}

impl Drop for MockIdentity {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn issue_token(
    State(state): State<Arc<IdentityState>>,
    headers: HeaderMap,
    Query(query): Query<std::collections::HashMap<String, String>>,
) -> Response {
    if headers.get("metadata").and_then(|v| v.to_str().ok()) != Some("true") {
        return (
            axum::http::StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_request", "error_description": "Required metadata header not specified"})),
        )
            .into_response();
    }

    state.queries.lock().unwrap().push(query);
    let n = state.issued.fetch_add(1, Ordering::SeqCst) + 1;

    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();

    Json(json!({
        "access_token": format!("mi-token-{n}"),
        "expires_on": (now + state.lifetime_secs).to_string(),
        "resource": "https://cognitiveservices.azure.com",
        "token_type": "Bearer"
    }))
    .into_response()
}
