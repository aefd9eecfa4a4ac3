use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    models::{NewScore, ScoreModel},
    query::parse_date,
};
use crate::shared::AppError;

/// Request payload for submitting a score
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateScoreRequest {
    pub player: String,
    pub score: i32,
}

impl CreateScoreRequest {
    /// Player must be non-empty letters and spaces; score must be at least 1
    pub fn validate(&self) -> Result<(), AppError> {
        if self.player.is_empty() {
            return Err(AppError::Validation("player should not be empty".to_string()));
        }
        if !self
            .player
            .chars()
            .all(|c| c.is_ascii_alphabetic() || c == ' ')
        {
            return Err(AppError::Validation(
                "player must contain only letters and spaces".to_string(),
            ));
        }
        if self.score < 1 {
            return Err(AppError::Validation("score min 1".to_string()));
        }
        Ok(())
    }
}

impl From<CreateScoreRequest> for NewScore {
    fn from(request: CreateScoreRequest) -> Self {
        NewScore {
            player: request.player,
            score: request.score,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Query string for listing scores
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationQuery {
    pub players: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub sort: SortOrder,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl PaginationQuery {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.page == Some(0) {
            return Err(AppError::Validation("page must not be less than 1".to_string()));
        }
        if self.limit == Some(0) {
            return Err(AppError::Validation("limit must not be less than 1".to_string()));
        }
        for (name, value) in [("startDate", &self.start_date), ("endDate", &self.end_date)] {
            if let Some(raw) = value {
                parse_date(raw).map_err(|_| {
                    AppError::Validation(format!("{} must be a valid ISO 8601 date string", name))
                })?;
            }
        }
        Ok(())
    }
}

/// Query string for the per-player history endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    pub player: String,
}

/// One page of scores plus the number of all matching records
#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedScores {
    pub players: Vec<ScoreModel>,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreInfo {
    pub score: i32,
    pub created_at: DateTime<Utc>,
}

impl From<&ScoreModel> for ScoreInfo {
    fn from(model: &ScoreModel) -> Self {
        ScoreInfo {
            score: model.score,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub top_score: ScoreInfo,
    pub low_score: ScoreInfo,
    pub average_score: f64,
    pub scores: Vec<ScoreInfo>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

impl DeleteResponse {
    pub fn deleted() -> Self {
        Self {
            success: true,
            message: "delete success!".to_string(),
        }
    }
}
