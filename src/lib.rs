pub mod config;
pub mod dispatch;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod model;
pub mod receipt;
pub mod registry;
pub mod server;
pub mod state;
pub mod tools;

pub use config::{CliArgs, ServerConfig, TransportKind};
pub use error::{ERROR_METRICS, ErrorCode, ErrorMetrics, RegistryError, to_rmcp_error};
pub use ledger::{InvocationContext, InvocationHeader, LedgerAccessor, MemoryLedger};
pub use logging::{LoggingConfig, init_logging};
pub use model::Asset;
pub use receipt::{ReceiptBuilder, TransactionReceipt};
pub use registry::AssetRegistry;
pub use server::RegistryServer;

use anyhow::Result;
use axum::{Json, Router, extract::State};
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use state::{AppState, InvocationStats};
use std::sync::Arc;
use tokio::net::TcpListener;

const HTTP_SERVICE_PATH: &str = "/mcp";

pub async fn run_server(config: ServerConfig) -> Result<()> {
    let config = Arc::new(config);
    let state = Arc::new(AppState::new(config.clone()));

    tracing::info!(
        transport = %config.transport,
        channel = %config.channel_id,
        msp_id = %config.msp_id,
        "starting asset registry MCP server",
    );

    if config.seed_on_start {
        seed_ledger(&state)?;
    }

    match config.transport {
        TransportKind::Stdio => {
            let server = RegistryServer::from_state(state);
            server.run_stdio().await
        }
        TransportKind::Http => run_stream_http_transport(config, state).await,
    }
}

/// Run InitLedger once as its own committed invocation.
pub fn seed_ledger(state: &AppState) -> Result<Vec<String>> {
    let seeded = state.invoke(dispatch::INIT_LEDGER, |registry, txn| {
        registry.init_ledger(txn)
    })?;
    tracing::info!(assets = ?seeded, "ledger seeded on start");
    Ok(seeded)
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<InvocationStats> {
    Json(state.stats())
}

async fn run_stream_http_transport(config: Arc<ServerConfig>, state: Arc<AppState>) -> Result<()> {
    let bind_addr = config.http_bind_address;
    let service_state = state.clone();
    let service = StreamableHttpService::new(
        move || Ok(RegistryServer::from_state(service_state.clone())),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let router = Router::new()
        .nest_service(HTTP_SERVICE_PATH, service)
        .route("/health", axum::routing::get(health_handler))
        .with_state(state);
    let listener = TcpListener::bind(bind_addr).await?;
    let actual_addr = listener.local_addr()?;
    tracing::info!(transport = "http", bind = %actual_addr, path = HTTP_SERVICE_PATH, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                tracing::error!(?error, "failed to listen for shutdown signal");
            }
            tracing::info!("shutdown signal received");
        })
        .await?;

    tracing::info!("server stopped");
    Ok(())
}
