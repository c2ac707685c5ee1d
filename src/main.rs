//! Trawl tracker web service

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use trawl_tracker::config::AppConfig;
use trawl_tracker::database::Database;
use trawl_tracker::errors::TrawlTrackerError;
use trawl_tracker::http::{build_router, AppState};
use trawl_tracker::templates::Templates;

#[tokio::main]
async fn main() -> Result<(), TrawlTrackerError> {
    #[cfg(feature = "dotenv")]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load configuration, preferring environment variables over config files
    let config = AppConfig::load()?;
    config.validate()?;

    let db = Database::connect(&config.database).await?;
    let templates = Templates::new()?;

    let state = AppState::new(db, templates, config.reports.clone());
    let app = build_router(state, config.server.max_upload_bytes);

    let listener = TcpListener::bind(&config.server.bind).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            match signal::ctrl_c().await {
                Ok(()) => info!("Received shutdown signal"),
                Err(e) => {
                    error!("Failed to listen for shutdown signal: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        })
        .await?;

    Ok(())
}
