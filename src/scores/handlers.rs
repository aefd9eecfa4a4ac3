use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;
use tracing::{info, instrument};

use super::{
    models::ScoreModel,
    service::ScoreService,
    types::{
        CreateScoreRequest, DeleteResponse, HistoryQuery, HistoryResponse, PaginatedScores,
        PaginationQuery,
    },
};
use crate::shared::{AppError, AppState};

fn service(state: &AppState) -> ScoreService {
    ScoreService::new(Arc::clone(&state.score_repository))
}

/// HTTP handler for submitting a score
///
/// POST /scores
#[instrument(name = "create_score", skip(state))]
pub async fn create_score(
    State(state): State<AppState>,
    Json(request): Json<CreateScoreRequest>,
) -> Result<Json<ScoreModel>, AppError> {
    request.validate()?;

    let score = service(&state).create(request).await?;
    Ok(Json(score))
}

/// HTTP handler for listing scores with filters and pagination
///
/// GET /scores?players=&startDate=&endDate=&sort=&page=&limit=
#[instrument(name = "list_scores", skip(state))]
pub async fn list_scores(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PaginatedScores>, AppError> {
    query.validate()?;

    let page = service(&state).find_all(query).await?;
    info!(total = page.total, "Scores listed successfully");
    Ok(Json(page))
}

/// GET /scores/history?player=<name>
#[instrument(name = "score_history", skip(state))]
pub async fn score_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let history = service(&state).history(&query.player).await?;
    Ok(Json(history))
}

/// GET /scores/:id
#[instrument(name = "get_score", skip(state))]
pub async fn get_score(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ScoreModel>, AppError> {
    let score = service(&state).find_one(id).await?;
    Ok(Json(score))
}

/// DELETE /scores/:id
#[instrument(name = "delete_score", skip(state))]
pub async fn delete_score(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DeleteResponse>, AppError> {
    let response = service(&state).remove(id).await?;
    Ok(Json(response))
}
