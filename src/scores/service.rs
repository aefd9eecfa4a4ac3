use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::{
    history,
    models::{NewScore, ScoreModel},
    query::ScoreQuery,
    repository::ScoreRepository,
    types::{
        CreateScoreRequest, DeleteResponse, HistoryResponse, PaginatedScores, PaginationQuery,
    },
};
use crate::shared::AppError;

/// Service for handling score business logic.
///
/// Every operation classifies failures at its boundary: `NotFound` and
/// `Validation` pass through untouched, anything else is wrapped into
/// `AppError::Internal` with the cause attached.
pub struct ScoreService {
    repository: Arc<dyn ScoreRepository + Send + Sync>,
}

fn classify(message: String, error: AppError) -> AppError {
    match error {
        AppError::NotFound(_) | AppError::Validation(_) => error,
        other => {
            warn!(error = %other, "{}", message);
            AppError::internal(message, other)
        }
    }
}

impl ScoreService {
    pub fn new(repository: Arc<dyn ScoreRepository + Send + Sync>) -> Self {
        Self { repository }
    }

    /// Persists a new score; input is expected to be validated already
    #[instrument(skip(self))]
    pub async fn create(&self, request: CreateScoreRequest) -> Result<ScoreModel, AppError> {
        let new_score = NewScore::from(request);

        let score = self
            .repository
            .create_score(&new_score)
            .await
            .map_err(|e| classify("cannot create score".to_string(), e))?;

        info!(score_id = score.id, player = %score.player, score = score.score, "Score created");
        Ok(score)
    }

    /// Lists one page of scores plus the total number of matches
    #[instrument(skip(self))]
    pub async fn find_all(&self, query: PaginationQuery) -> Result<PaginatedScores, AppError> {
        let score_query = ScoreQuery::from_pagination(&query)?;
        debug!(?score_query, "Built score query");

        let (players, total) = self
            .repository
            .find_and_count(&score_query)
            .await
            .map_err(|e| {
                let message = e.to_string();
                classify(message, e)
            })?;

        info!(total, page_size = players.len(), "Scores listed");
        Ok(PaginatedScores { players, total })
    }

    #[instrument(skip(self))]
    pub async fn find_one(&self, id: i32) -> Result<ScoreModel, AppError> {
        self.repository
            .get_score(id)
            .await
            .map_err(|e| classify(format!("cannot get score with id:{}", id), e))?
            .ok_or_else(|| {
                debug!(score_id = id, "Score not found");
                AppError::NotFound("Score not found".to_string())
            })
    }

    /// Computes top, low and average score for one player
    #[instrument(skip(self))]
    pub async fn history(&self, player: &str) -> Result<HistoryResponse, AppError> {
        let records = self
            .repository
            .find_by_player(player)
            .await
            .map_err(|e| classify(format!("cannot get history with player: {}", player), e))?;

        let history = history::aggregate(&records).ok_or_else(|| {
            debug!(player = %player, "No scores recorded for player");
            AppError::NotFound(format!("Not found player with {}", player))
        })?;

        info!(
            player = %player,
            count = history.scores.len(),
            average = history.average_score,
            "Score history computed"
        );
        Ok(history)
    }

    /// Soft-deletes a score; unknown ids are reported without touching the store
    #[instrument(skip(self))]
    pub async fn remove(&self, id: i32) -> Result<DeleteResponse, AppError> {
        let message = || format!("cannot delete score with id:{}", id);

        let existing = self
            .repository
            .get_score(id)
            .await
            .map_err(|e| classify(message(), e))?;
        if existing.is_none() {
            debug!(score_id = id, "Score not found for deletion");
            return Err(AppError::NotFound("Score not found".to_string()));
        }

        self.repository
            .soft_delete(id)
            .await
            .map_err(|e| classify(message(), e))?;

        info!(score_id = id, "Score deleted");
        Ok(DeleteResponse::deleted())
    }
}
