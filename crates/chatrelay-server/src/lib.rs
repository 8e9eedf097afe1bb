mod cors;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use chatrelay_auth::Credential;
use chatrelay_config::Config;
use chatrelay_llm::{ChatBackend, ChatState, UpstreamClient};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
    backend: Arc<dyn ChatBackend>,
}

impl Server {
    /// Build the server from configuration
    ///
    /// Resolves the upstream credential first; a credential chain that
    /// cannot produce a token aborts startup.
    ///
    /// # Errors
    ///
    /// Returns an error if credential resolution or server assembly fails
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let credential = chatrelay_auth::resolve(&config.upstream)
            .await
            .context("failed to resolve upstream credential")?;

        Self::with_credential(config, credential)
    }

    /// Build the server with an already resolved credential
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream client or CORS layer cannot be built
    pub fn with_credential(config: Config, credential: Credential) -> anyhow::Result<Self> {
        let upstream = UpstreamClient::new(&config.upstream, credential)?;
        Self::with_backend(config, Arc::new(upstream))
    }

    /// Build the server around an existing chat backend
    ///
    /// The server owns the backend's lifecycle and closes it after shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the CORS layer cannot be built
    pub fn with_backend(config: Config, backend: Arc<dyn ChatBackend>) -> anyhow::Result<Self> {
        let listen_address = config
            .server
            .listen_address
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let mut app = Router::new();

        // Health check
        if config.server.health.enabled {
            app = app.route(&config.server.health.path, axum::routing::get(|| async { "ok" }));
        }

        // Chat page and endpoint
        app = app.merge(chatrelay_llm::chat_router(ChatState::new(Arc::clone(&backend), &config.chat)));

        // Apply middleware layers (innermost first)

        // Tracing
        app = app.layer(TraceLayer::new_for_http());

        // CORS
        if let Some(ref cors_config) = config.server.cors {
            app = app.layer(cors::cors_layer(cors_config)?);
        }

        Ok(Self {
            router: app,
            listen_address,
            backend,
        })
    }

    /// Get the configured listen address
    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Start serving requests on the configured address
    ///
    /// Blocks until the cancellation token is triggered and in-flight
    /// responses have finished, then closes the chat backend.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.listen_address)
            .await
            .with_context(|| format!("failed to bind {}", self.listen_address))?;

        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already bound listener
    ///
    /// The backend is closed exactly once when serving stops, whether it
    /// stopped cleanly or with an error.
    ///
    /// # Errors
    ///
    /// Returns an error if serving fails
    pub async fn serve_on(self, listener: TcpListener, shutdown: CancellationToken) -> anyhow::Result<()> {
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        let served = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await;

        self.backend.close();
        tracing::info!("server stopped");

        served.context("server failed")
    }
}
