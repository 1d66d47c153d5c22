use clap::Parser;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

use shareit::config::{Cli, Config, Mode};
use shareit::gateway::{self, GatewayClient};
use shareit::state::AppState;
use shareit::{db, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let config = Config::load(&cli)?;

    match cli.mode() {
        Mode::Server => run_server(config).await,
        Mode::Gateway { .. } => run_gateway(config).await,
    }
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    let pool = db::create_pool(config.db_path())?;
    db::run_migrations(&pool)?;
    tracing::info!("Database: {}", config.db_path().display());

    let addr: SocketAddr = config.server_addr().parse()?;
    let app = routes::router(AppState::new(pool));

    tracing::info!("Core server listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_gateway(config: Config) -> anyhow::Result<()> {
    let client = GatewayClient::new(config.gateway.upstream.clone())?;
    let addr: SocketAddr = config.gateway_addr().parse()?;

    tracing::info!(
        "Gateway listening on http://{}, forwarding to {}",
        addr,
        client.upstream()
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, gateway::router(client)).await?;

    Ok(())
}
