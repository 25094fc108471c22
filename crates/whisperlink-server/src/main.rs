//! Whisperlink server binary.
//!
//! # Usage
//!
//! ```bash
//! # Start on the default port
//! whisperlink-server --bind 0.0.0.0:3001
//!
//! # Match the legacy product's inflated online counter
//! whisperlink-server --bind 0.0.0.0:3001 --boost-online-count
//! ```

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use whisperlink_core::EngineConfig;
use whisperlink_server::{Server, ServerRuntimeConfig};

/// Whisperlink anonymous chat pairing server
#[derive(Parser, Debug)]
#[command(name = "whisperlink-server")]
#[command(about = "Anonymous chat pairing server")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:3001")]
    bind: String,

    /// Maximum concurrent connections
    #[arg(long, default_value = "10000")]
    max_connections: usize,

    /// Character limit for chat messages
    #[arg(long, default_value = "1000")]
    max_message_len: usize,

    /// Recent partners remembered per participant
    #[arg(long, default_value = "5")]
    history_limit: usize,

    /// Inflate the displayed online count by 1.5x, as the legacy
    /// product did
    #[arg(long)]
    boost_online_count: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Whisperlink server starting");
    tracing::info!("Binding to {}", args.bind);

    let config = ServerRuntimeConfig {
        bind_address: args.bind,
        engine: EngineConfig {
            max_connections: args.max_connections,
            max_message_len: args.max_message_len,
            history_limit: args.history_limit,
            boost_online_count: args.boost_online_count,
            ..EngineConfig::default()
        },
    };

    let server = Server::bind(config).await?;

    tracing::info!("Server listening on {}", server.local_addr()?);

    server.run().await?;

    Ok(())
}
