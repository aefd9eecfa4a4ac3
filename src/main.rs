use std::sync::Arc;

use score_board::{
    build_router, AppConfig, AppState, InMemoryScoreRepository, PostgresScoreRepository,
    ScoreRepository, StorageBackend,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "score_board=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting score board server");

    let config = AppConfig::from_env().map_err(|e| {
        error!(error = %e, "Invalid configuration");
        e
    })?;

    let score_repository: Arc<dyn ScoreRepository + Send + Sync> = match config.storage {
        StorageBackend::Memory => {
            info!("Using in-memory score store");
            Arc::new(InMemoryScoreRepository::new())
        }
        StorageBackend::Postgres => {
            info!(
                host = %config.database.host,
                port = config.database.port,
                database = %config.database.database,
                "Connecting to PostgreSQL"
            );
            let pool = config.database.create_pool().await.map_err(|e| {
                error!(error = %e, "Failed to connect to database");
                e
            })?;
            let repository = PostgresScoreRepository::new(pool);
            repository.run_migrations().await?;
            Arc::new(repository)
        }
    };

    let app = build_router(AppState::new(score_repository));

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Server running on http://{}", address);
    axum::serve(listener, app).await?;

    Ok(())
}
