use std::sync::Arc;

use hotel_marketplace::config::AppConfig;
use hotel_marketplace::db::{MemoryStore, PgStore, Store};
use hotel_marketplace::{app, AppState};

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for ctrl-c: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let config = AppConfig::load()?;
    log::info!(
        "Loaded config: env={} bind={}:{} uploads={} status_validation={:?}",
        config.app_env,
        config.bind_address,
        config.port,
        config.uploads_dir,
        config.booking_status_validation
    );

    std::fs::create_dir_all(&config.uploads_dir)
        .map_err(|e| format!("Failed to create uploads directory {}: {}", config.uploads_dir, e))?;

    let store: Arc<dyn Store> = if config.uses_memory_store() {
        log::warn!("Using in-memory store; data is lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        let url = config.database_url.clone();
        let pool_size = config.db_pool_size;
        let store = tokio::task::spawn_blocking(move || PgStore::connect(&url, pool_size))
            .await?
            .map_err(|e| format!("Failed to connect to database: {}", e))?;
        Arc::new(store)
    };

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("Starting server on {}", addr);

    let state = AppState { config, store };
    axum::serve(listener, app(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server stopped");
    Ok(())
}
