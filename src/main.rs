use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::anyhow;
use axum::Router;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use sdr_gateway::{ServerConfig, routes, state::AppState};

/// SDR Gateway - conversation relay server for live telephony streams
#[derive(Parser, Debug)]
#[command(name = "sdr-gateway")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Override the listen port from the environment
    #[arg(short = 'p', long = "port")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let mut config = ServerConfig::from_env().map_err(|e| anyhow!(e.to_string()))?;
    if let Some(port) = cli.port {
        config.port = port;
    }

    let address = config.address();
    let app_state = Arc::new(AppState::from_config(config).map_err(|e| anyhow!(e.to_string()))?);

    let app = Router::new()
        .route("/", axum::routing::get(sdr_gateway::handlers::api::health_check))
        .merge(routes::relay::create_relay_router())
        .with_state(app_state);

    let socket_addr: SocketAddr = address
        .parse()
        .map_err(|e| anyhow!("Invalid server address '{}': {}", address, e))?;

    info!("Server listening on http://{socket_addr}");

    let listener = TcpListener::bind(&socket_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
