use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

use crate::scores::repository::ScoreRepository;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub score_repository: Arc<dyn ScoreRepository + Send + Sync>,
}

impl AppState {
    pub fn new(score_repository: Arc<dyn ScoreRepository + Send + Sync>) -> Self {
        Self { score_repository }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<AppError>>,
    },
}

impl AppError {
    /// Wraps a lower-level failure into an internal error, keeping it as the source
    pub fn internal(message: impl Into<String>, cause: AppError) -> Self {
        AppError::Internal {
            message: message.into(),
            source: Some(Box::new(cause)),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::DatabaseError(msg) => {
                error!(error = %msg, "Unclassified database error reached the API layer");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Database error: {}", msg),
                )
            }
            AppError::Internal { message, source } => {
                match &source {
                    Some(cause) => error!(error = %message, cause = %cause, "Internal error"),
                    None => error!(error = %message, "Internal error"),
                }
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };

        let body = Json(json!({
            "status": status.as_u16(),
            "error": error_message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use crate::scores::{
        models::{NewScore, ScoreModel},
        query::ScoreQuery,
        repository::InMemoryScoreRepository,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Repository whose every call fails, as an unreachable database would
    pub struct FailingScoreRepository;

    fn unavailable() -> AppError {
        AppError::DatabaseError("connection refused".to_string())
    }

    #[async_trait]
    impl ScoreRepository for FailingScoreRepository {
        async fn create_score(&self, _score: &NewScore) -> Result<ScoreModel, AppError> {
            Err(unavailable())
        }
        async fn get_score(&self, _id: i32) -> Result<Option<ScoreModel>, AppError> {
            Err(unavailable())
        }
        async fn find_and_count(
            &self,
            _query: &ScoreQuery,
        ) -> Result<(Vec<ScoreModel>, i64), AppError> {
            Err(unavailable())
        }
        async fn find_by_player(&self, _player: &str) -> Result<Vec<ScoreModel>, AppError> {
            Err(unavailable())
        }
        async fn soft_delete(&self, _id: i32) -> Result<(), AppError> {
            Err(unavailable())
        }
    }

    /// In-memory repository that counts how often `soft_delete` is issued
    #[derive(Default)]
    pub struct SpyScoreRepository {
        inner: InMemoryScoreRepository,
        delete_calls: AtomicUsize,
    }

    impl SpyScoreRepository {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn delete_calls(&self) -> usize {
            self.delete_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ScoreRepository for SpyScoreRepository {
        async fn create_score(&self, score: &NewScore) -> Result<ScoreModel, AppError> {
            self.inner.create_score(score).await
        }
        async fn get_score(&self, id: i32) -> Result<Option<ScoreModel>, AppError> {
            self.inner.get_score(id).await
        }
        async fn find_and_count(
            &self,
            query: &ScoreQuery,
        ) -> Result<(Vec<ScoreModel>, i64), AppError> {
            self.inner.find_and_count(query).await
        }
        async fn find_by_player(&self, player: &str) -> Result<Vec<ScoreModel>, AppError> {
            self.inner.find_by_player(player).await
        }
        async fn soft_delete(&self, id: i32) -> Result<(), AppError> {
            self.delete_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.soft_delete(id).await
        }
    }

    /// Builder for creating AppState with overrides for testing
    pub struct AppStateBuilder {
        score_repository: Option<Arc<dyn ScoreRepository + Send + Sync>>,
    }

    impl AppStateBuilder {
        pub fn new() -> Self {
            Self {
                score_repository: None,
            }
        }

        pub fn with_score_repository(
            mut self,
            repo: Arc<dyn ScoreRepository + Send + Sync>,
        ) -> Self {
            self.score_repository = Some(repo);
            self
        }

        pub fn build(self) -> AppState {
            AppState {
                score_repository: self
                    .score_repository
                    .unwrap_or_else(|| Arc::new(InMemoryScoreRepository::new())),
            }
        }
    }

    impl Default for AppStateBuilder {
        fn default() -> Self {
            Self::new()
        }
    }
}
