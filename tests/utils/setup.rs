use axum::{http::StatusCode, response::Response, Router};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

use score_board::{build_router, AppState, InMemoryScoreRepository, ScoreModel};

use super::requests::{post_json, read_json};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestApp {
    router: Router,
    pub repository: Arc<InMemoryScoreRepository>,
}

impl TestApp {
    pub fn new() -> Self {
        let repository = Arc::new(InMemoryScoreRepository::new());
        let router = build_router(AppState::new(repository.clone()));
        Self { router, repository }
    }

    pub async fn send(&self, request: axum::http::Request<axum::body::Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Submits a score through the API and returns the stored record
    pub async fn submit(&self, player: &str, score: i32) -> ScoreModel {
        let response = self
            .send(post_json(
                "/scores",
                json!({ "player": player, "score": score }),
            ))
            .await;
        read_json(response, StatusCode::OK).await
    }
}
