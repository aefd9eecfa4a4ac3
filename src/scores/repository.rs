use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::{
    models::{NewScore, ScoreModel},
    query::ScoreQuery,
    types::SortOrder,
};
use crate::shared::AppError;

/// Trait for score repository operations.
///
/// Every read excludes soft-deleted records.
#[async_trait]
pub trait ScoreRepository {
    async fn create_score(&self, score: &NewScore) -> Result<ScoreModel, AppError>;
    async fn get_score(&self, id: i32) -> Result<Option<ScoreModel>, AppError>;

    /// Returns the requested page together with the count of all matching records
    async fn find_and_count(&self, query: &ScoreQuery)
        -> Result<(Vec<ScoreModel>, i64), AppError>;

    /// All records of one player (exact name match), oldest first
    async fn find_by_player(&self, player: &str) -> Result<Vec<ScoreModel>, AppError>;

    async fn soft_delete(&self, id: i32) -> Result<(), AppError>;
}

struct InMemoryState {
    next_id: i32,
    scores: BTreeMap<i32, ScoreModel>,
}

/// In-memory implementation of ScoreRepository for development and testing
pub struct InMemoryScoreRepository {
    state: Mutex<InMemoryState>,
}

impl Default for InMemoryScoreRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryScoreRepository {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(InMemoryState {
                next_id: 1,
                scores: BTreeMap::new(),
            }),
        }
    }

    /// Creates a repository pre-populated with records, keeping their ids
    pub fn with_scores(scores: Vec<ScoreModel>) -> Self {
        let next_id = scores.iter().map(|s| s.id).max().unwrap_or(0) + 1;
        let scores = scores.into_iter().map(|s| (s.id, s)).collect();

        Self {
            state: Mutex::new(InMemoryState { next_id, scores }),
        }
    }

    /// Number of stored rows, soft-deleted ones included
    pub fn row_count(&self) -> usize {
        self.lock().map(|state| state.scores.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, InMemoryState>, AppError> {
        self.state
            .lock()
            .map_err(|_| AppError::DatabaseError("score store lock poisoned".to_string()))
    }
}

#[async_trait]
impl ScoreRepository for InMemoryScoreRepository {
    #[instrument(skip(self, score))]
    async fn create_score(&self, score: &NewScore) -> Result<ScoreModel, AppError> {
        debug!(player = %score.player, score = score.score, "Creating score in memory");

        let mut state = self.lock()?;
        let now = Utc::now();
        let model = ScoreModel {
            id: state.next_id,
            player: score.player.clone(),
            score: score.score,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        state.next_id += 1;
        state.scores.insert(model.id, model.clone());

        debug!(score_id = model.id, "Score created successfully in memory");
        Ok(model)
    }

    #[instrument(skip(self))]
    async fn get_score(&self, id: i32) -> Result<Option<ScoreModel>, AppError> {
        let state = self.lock()?;
        let score = state.scores.get(&id).filter(|s| !s.is_deleted()).cloned();

        match &score {
            Some(s) => debug!(score_id = id, player = %s.player, "Score found in memory"),
            None => debug!(score_id = id, "Score not found in memory"),
        }

        Ok(score)
    }

    #[instrument(skip(self))]
    async fn find_and_count(
        &self,
        query: &ScoreQuery,
    ) -> Result<(Vec<ScoreModel>, i64), AppError> {
        let state = self.lock()?;
        let matching: Vec<&ScoreModel> = state
            .scores
            .values()
            .filter(|s| query.matches(s))
            .collect();
        let total = matching.len() as i64;

        let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
        let take = usize::try_from(query.take).unwrap_or(usize::MAX);
        let page: Vec<ScoreModel> = match query.order {
            SortOrder::Asc => matching
                .into_iter()
                .skip(skip)
                .take(take)
                .cloned()
                .collect(),
            SortOrder::Desc => matching
                .into_iter()
                .rev()
                .skip(skip)
                .take(take)
                .cloned()
                .collect(),
        };

        debug!(total, page_size = page.len(), "Scores listed from memory");
        Ok((page, total))
    }

    #[instrument(skip(self))]
    async fn find_by_player(&self, player: &str) -> Result<Vec<ScoreModel>, AppError> {
        let state = self.lock()?;
        let scores: Vec<ScoreModel> = state
            .scores
            .values()
            .filter(|s| !s.is_deleted() && s.player == player)
            .cloned()
            .collect();

        debug!(player = %player, count = scores.len(), "Player scores fetched from memory");
        Ok(scores)
    }

    #[instrument(skip(self))]
    async fn soft_delete(&self, id: i32) -> Result<(), AppError> {
        let mut state = self.lock()?;
        match state.scores.get_mut(&id) {
            Some(score) if !score.is_deleted() => {
                score.mark_deleted(Utc::now());
                debug!(score_id = id, "Score soft-deleted in memory");
                Ok(())
            }
            _ => {
                warn!(score_id = id, "Score not found for deletion in memory");
                Err(AppError::NotFound("Score not found".to_string()))
            }
        }
    }
}

const SCORE_COLUMNS: &str = "id, player, score, created_at, updated_at, deleted_at";

/// PostgreSQL implementation of score repository
pub struct PostgresScoreRepository {
    pool: PgPool,
}

impl PostgresScoreRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the score table when it does not exist yet
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to run score migrations");
                AppError::DatabaseError(e.to_string())
            })
    }
}

fn database_error(e: sqlx::Error) -> AppError {
    AppError::DatabaseError(e.to_string())
}

#[async_trait]
impl ScoreRepository for PostgresScoreRepository {
    #[instrument(skip(self, score))]
    async fn create_score(&self, score: &NewScore) -> Result<ScoreModel, AppError> {
        debug!(player = %score.player, score = score.score, "Creating score in database");

        let model = sqlx::query_as::<_, ScoreModel>(&format!(
            "INSERT INTO score (player, score) VALUES ($1, $2) RETURNING {}",
            SCORE_COLUMNS
        ))
        .bind(&score.player)
        .bind(score.score)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to create score in database");
            database_error(e)
        })?;

        debug!(score_id = model.id, "Score created successfully in database");
        Ok(model)
    }

    #[instrument(skip(self))]
    async fn get_score(&self, id: i32) -> Result<Option<ScoreModel>, AppError> {
        debug!(score_id = id, "Fetching score from database");

        let score = sqlx::query_as::<_, ScoreModel>(&format!(
            "SELECT {} FROM score WHERE id = $1 AND deleted_at IS NULL",
            SCORE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, score_id = id, "Failed to fetch score from database");
            database_error(e)
        })?;

        if score.is_none() {
            debug!(score_id = id, "Score not found in database");
        }
        Ok(score)
    }

    #[instrument(skip(self))]
    async fn find_and_count(
        &self,
        query: &ScoreQuery,
    ) -> Result<(Vec<ScoreModel>, i64), AppError> {
        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) AS total FROM score");
        query.push_filters(&mut count_builder);

        let total: i64 = count_builder
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to count scores in database");
                database_error(e)
            })?
            .get("total");

        let mut page_builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM score", SCORE_COLUMNS));
        query.push_filters(&mut page_builder);
        query.push_window(&mut page_builder);

        let page = page_builder
            .build_query_as::<ScoreModel>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to list scores from database");
                database_error(e)
            })?;

        debug!(total, page_size = page.len(), "Scores listed from database");
        Ok((page, total))
    }

    #[instrument(skip(self))]
    async fn find_by_player(&self, player: &str) -> Result<Vec<ScoreModel>, AppError> {
        let scores = sqlx::query_as::<_, ScoreModel>(&format!(
            "SELECT {} FROM score WHERE player = $1 AND deleted_at IS NULL ORDER BY id ASC",
            SCORE_COLUMNS
        ))
        .bind(player)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, player = %player, "Failed to fetch player scores from database");
            database_error(e)
        })?;

        debug!(player = %player, count = scores.len(), "Player scores fetched from database");
        Ok(scores)
    }

    #[instrument(skip(self))]
    async fn soft_delete(&self, id: i32) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE score SET deleted_at = now(), updated_at = now() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, score_id = id, "Failed to delete score in database");
            database_error(e)
        })?;

        if result.rows_affected() == 0 {
            warn!(score_id = id, "Score not found for deletion");
            return Err(AppError::NotFound("Score not found".to_string()));
        }

        debug!(score_id = id, "Score soft-deleted in database");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scores::query::CreatedAtFilter;
    use chrono::{DateTime, Duration, TimeZone};

    /// Test helper functions for creating test data
    mod helpers {
        use super::*;

        pub fn new_score(player: &str, score: i32) -> NewScore {
            NewScore {
                player: player.to_string(),
                score,
            }
        }

        pub fn stored(id: i32, player: &str, score: i32, created_at: DateTime<Utc>) -> ScoreModel {
            ScoreModel {
                id,
                player: player.to_string(),
                score,
                created_at,
                updated_at: created_at,
                deleted_at: None,
            }
        }

        pub fn day(d: u32) -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
        }
    }

    use helpers::*;

    #[tokio::test]
    async fn test_create_assigns_increasing_ids() {
        let repo = InMemoryScoreRepository::new();

        let first = repo.create_score(&new_score("Alice", 10)).await.unwrap();
        let second = repo.create_score(&new_score("Bob", 20)).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.player, "Alice");
        assert_eq!(first.created_at, first.updated_at);
        assert!(first.deleted_at.is_none());
    }

    #[tokio::test]
    async fn test_get_nonexistent_score() {
        let repo = InMemoryScoreRepository::new();
        assert!(repo.get_score(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_soft_delete_hides_record_but_keeps_row() {
        let repo = InMemoryScoreRepository::new();
        let created = repo.create_score(&new_score("Alice", 10)).await.unwrap();

        repo.soft_delete(created.id).await.unwrap();

        assert!(repo.get_score(created.id).await.unwrap().is_none());
        assert!(repo.find_by_player("Alice").await.unwrap().is_empty());
        let (page, total) = repo.find_and_count(&ScoreQuery::default()).await.unwrap();
        assert!(page.is_empty());
        assert_eq!(total, 0);
        assert_eq!(repo.row_count(), 1);
    }

    #[tokio::test]
    async fn test_soft_delete_twice_is_not_found() {
        let repo = InMemoryScoreRepository::new();
        let created = repo.create_score(&new_score("Alice", 10)).await.unwrap();

        repo.soft_delete(created.id).await.unwrap();
        let result = repo.soft_delete(created.id).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_find_and_count_pages_and_orders_by_id() {
        let repo = InMemoryScoreRepository::with_scores(
            (1..=12).map(|i| stored(i, "Alice", i * 10, day(1))).collect(),
        );

        let query = ScoreQuery {
            skip: 5,
            take: 5,
            ..ScoreQuery::default()
        };
        let (page, total) = repo.find_and_count(&query).await.unwrap();
        let ids: Vec<i32> = page.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![6, 7, 8, 9, 10]);
        assert_eq!(total, 12);

        let query = ScoreQuery {
            order: SortOrder::Desc,
            take: 3,
            ..ScoreQuery::default()
        };
        let (page, total) = repo.find_and_count(&query).await.unwrap();
        let ids: Vec<i32> = page.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![12, 11, 10]);
        assert_eq!(total, 12);
    }

    #[tokio::test]
    async fn test_find_and_count_applies_filters_to_total() {
        let repo = InMemoryScoreRepository::with_scores(vec![
            stored(1, "a", 1, day(1)),
            stored(2, "b", 2, day(5)),
            stored(3, "c", 3, day(5)),
            stored(4, "a", 4, day(10)),
            stored(5, "b", 5, day(20)),
        ]);

        let query = ScoreQuery {
            players: Some(vec!["a".to_string(), "b".to_string()]),
            created_at: Some(CreatedAtFilter::Between(day(1), day(10))),
            take: 1,
            ..ScoreQuery::default()
        };
        let (page, total) = repo.find_and_count(&query).await.unwrap();

        assert_eq!(total, 3);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, 1);
    }

    #[tokio::test]
    async fn test_find_by_player_is_exact_and_ordered() {
        let base = day(1);
        let repo = InMemoryScoreRepository::with_scores(vec![
            stored(3, "Alice", 30, base + Duration::hours(2)),
            stored(1, "Alice", 10, base),
            stored(2, "alice", 20, base + Duration::hours(1)),
        ]);

        let scores = repo.find_by_player("Alice").await.unwrap();
        let ids: Vec<i32> = scores.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_with_scores_continues_id_sequence() {
        let repo = InMemoryScoreRepository::with_scores(vec![stored(7, "Alice", 1, day(1))]);
        let created = repo.create_score(&new_score("Bob", 2)).await.unwrap();
        assert_eq!(created.id, 8);
    }
}
