use anyhow::Result;
use careledger_server::{routes, CareLedgerServer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let server = CareLedgerServer::new().await?;
    let app = routes::create_router(server.clone());

    let listener = tokio::net::TcpListener::bind(&server.config.bind_addr).await?;
    info!(addr = %server.config.bind_addr, "CareLedger server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = &server.db_pool {
        pool.close().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
