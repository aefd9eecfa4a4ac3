use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database model for the score table
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreModel {
    pub id: i32, // Serial primary key, assigned by the store
    pub player: String,
    pub score: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>, // Soft-delete marker
}

impl ScoreModel {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Marks the record as deleted without removing it
    pub fn mark_deleted(&mut self, at: DateTime<Utc>) {
        self.deleted_at = Some(at);
        self.updated_at = at;
    }
}

/// Fields supplied by the caller when inserting a score; the store fills in the rest
#[derive(Debug, Clone, PartialEq)]
pub struct NewScore {
    pub player: String,
    pub score: i32,
}
