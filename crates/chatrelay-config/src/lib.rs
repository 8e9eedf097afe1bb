#![allow(clippy::must_use_candidate)]

pub mod chat;
pub mod cors;
mod env;
pub mod health;
mod loader;
pub mod server;
pub mod telemetry;
pub mod upstream;

use serde::Deserialize;

pub use chat::*;
pub use cors::*;
pub use health::*;
pub use server::*;
pub use telemetry::TelemetryConfig;
pub use upstream::*;

/// Top-level chatrelay configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Upstream chat-completion deployment
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Prompt construction and response mode
    #[serde(default)]
    pub chat: ChatConfig,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}
