// Library crate for the score board service
// This file exposes the public API for the binary and integration tests

pub mod config;
pub mod scores;
pub mod shared;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

// Re-export commonly used types for easier access in tests
pub use config::{AppConfig, ConfigError, DatabaseConfig, StorageBackend};
pub use scores::{
    models::ScoreModel,
    repository::{InMemoryScoreRepository, PostgresScoreRepository, ScoreRepository},
    ScoreService,
};
pub use shared::{AppError, AppState};

/// Builds the HTTP router with all score routes
pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Score board is running" }))
        .route(
            "/scores",
            get(scores::list_scores).post(scores::create_score),
        )
        .route("/scores/history", get(scores::score_history))
        .route(
            "/scores/:id",
            get(scores::get_score).delete(scores::delete_score),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
