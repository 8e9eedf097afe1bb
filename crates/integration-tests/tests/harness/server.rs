//! Test server wrapper that starts chatrelay on a random port

use std::net::SocketAddr;
use std::sync::Arc;

use chatrelay_auth::Credential;
use chatrelay_config::Config;
use chatrelay_llm::ChatBackend;
use chatrelay_server::Server;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A running test server instance
pub struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    handle: Option<JoinHandle<anyhow::Result<()>>>,
    client: reqwest::Client,
}

impl TestServer {
    /// Start a test server with the given configuration
    ///
    /// Binds to port 0 for automatic port assignment
    pub async fn start(config: Config) -> anyhow::Result<Self> {
        let server = Server::new(config).await?;
        Self::spawn(server).await
    }

    /// Start a test server with an injected upstream credential
    pub async fn start_with_credential(config: Config, credential: Credential) -> anyhow::Result<Self> {
        let server = Server::with_credential(config, credential)?;
        Self::spawn(server).await
    }

    /// Start a test server in front of an injected chat backend
    pub async fn start_with_backend(config: Config, backend: Arc<dyn ChatBackend>) -> anyhow::Result<Self> {
        let server = Server::with_backend(config, backend)?;
        Self::spawn(server).await
    }

    async fn spawn(server: Server) -> anyhow::Result<Self> {
        let shutdown = CancellationToken::new();

        // Bind the listener here so we know the actual port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(server.serve_on(listener, shutdown.clone()));

        let client = reqwest::Client::new();

        Ok(Self {
            addr,
            shutdown,
            handle: Some(handle),
            client,
        })
    }

    /// Base URL of the running test server
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Get a reference to the HTTP client
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// POST a JSON body to `/chat`
    pub async fn chat(&self, body: &serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.url("/chat"))
            .json(body)
            .send()
            .await
            .expect("chat request failed")
    }

    /// Trigger graceful shutdown without waiting for it
    pub fn begin_shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Shut down and wait for the server task to finish
    pub async fn shutdown(mut self) -> anyhow::Result<()> {
        self.shutdown.cancel();
        match self.handle.take() {
            Some(handle) => handle.await?,
            None => Ok(()),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
