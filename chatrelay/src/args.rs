use std::path::PathBuf;

use clap::Parser;

/// Chat relay for Azure OpenAI
#[derive(Debug, Parser)]
#[command(name = "chatrelay", about = "Streams Azure OpenAI chat completions to clients as JSON lines")]
pub struct Args {
    /// Path to a TOML configuration file; without one, configuration is read
    /// from `AZURE_OPENAI_*` environment variables
    #[arg(short, long, env = "CHATRELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the listen address
    #[arg(long, env = "CHATRELAY_LISTEN")]
    pub listen: Option<std::net::SocketAddr>,
}
