// File: crates/services/pawtrips_backend/src/main.rs
use pawtrips_backend::{build_router, PawtripsServiceFactory};
use pawtrips_common::logging;
use pawtrips_config::load_config;
use pawtrips_db::{DbClientFactory, Repositories};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match load_config() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            logging::init();
            error!("Failed to load config: {}", e);
            return Err(e.into());
        }
    };
    let _log_guard = logging::init_from_config(&config.logging);

    let db_client = DbClientFactory::new().connect_and_migrate(&config).await.map_err(|e| {
        error!("Database setup failed: {}", e);
        e
    })?;
    let repos = Repositories::new(&db_client);
    let services = Arc::new(PawtripsServiceFactory::new(config.clone()));

    let app = build_router(config.clone(), repos, services);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Starting server at http://{}", addr);
    info!("API endpoints available at http://{}/api", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}
