use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use super::{
    models::ScoreModel,
    types::{PaginationQuery, SortOrder},
};
use crate::shared::AppError;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;

/// Date-time layouts with an offset (`Z`, `+02:00`, `+0200`, `+02`)
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M%#z"];

/// Date-time layouts without an offset, read as UTC
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parses an ISO 8601 date or date-time; values without an offset are taken as UTC
pub fn parse_date(raw: &str) -> Result<DateTime<Utc>, AppError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(raw, format) {
            return Ok(parsed.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(AppError::Validation(format!("invalid date: {}", raw)))
}

/// Constraint on `created_at`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CreatedAtFilter {
    /// Strictly after the bound
    After(DateTime<Utc>),
    /// Strictly before the bound
    Before(DateTime<Utc>),
    /// Within the range, both ends inclusive
    Between(DateTime<Utc>, DateTime<Utc>),
}

impl CreatedAtFilter {
    pub fn from_bounds(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Option<Self> {
        match (start, end) {
            (Some(start), None) => Some(CreatedAtFilter::After(start)),
            (None, Some(end)) => Some(CreatedAtFilter::Before(end)),
            (Some(start), Some(end)) => Some(CreatedAtFilter::Between(start, end)),
            (None, None) => None,
        }
    }

    pub fn contains(&self, created_at: DateTime<Utc>) -> bool {
        match *self {
            CreatedAtFilter::After(start) => created_at > start,
            CreatedAtFilter::Before(end) => created_at < end,
            CreatedAtFilter::Between(start, end) => start <= created_at && created_at <= end,
        }
    }
}

/// Store-level query built from a listing request: filter, ordering and page window
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreQuery {
    pub players: Option<Vec<String>>,
    pub created_at: Option<CreatedAtFilter>,
    pub order: SortOrder,
    pub skip: u64,
    pub take: u64,
}

impl Default for ScoreQuery {
    fn default() -> Self {
        Self {
            players: None,
            created_at: None,
            order: SortOrder::Asc,
            skip: 0,
            take: DEFAULT_LIMIT as u64,
        }
    }
}

impl ScoreQuery {
    pub fn from_pagination(query: &PaginationQuery) -> Result<Self, AppError> {
        let page = query.page.unwrap_or(DEFAULT_PAGE);
        let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
        if page < 1 || limit < 1 {
            return Err(AppError::Validation(
                "page and limit must not be less than 1".to_string(),
            ));
        }

        // Entries are compared exactly as split, surrounding whitespace included
        let players = query
            .players
            .as_ref()
            .map(|raw| raw.split(',').map(str::to_string).collect());

        let start = query.start_date.as_deref().map(parse_date).transpose()?;
        let end = query.end_date.as_deref().map(parse_date).transpose()?;

        Ok(Self {
            players,
            created_at: CreatedAtFilter::from_bounds(start, end),
            order: query.sort,
            skip: (page as u64 - 1) * limit as u64,
            take: limit as u64,
        })
    }

    /// Evaluates the filter part of the query against a single live record
    pub fn matches(&self, record: &ScoreModel) -> bool {
        if record.is_deleted() {
            return false;
        }
        if let Some(players) = &self.players {
            if !players.iter().any(|p| *p == record.player) {
                return false;
            }
        }
        match &self.created_at {
            Some(filter) => filter.contains(record.created_at),
            None => true,
        }
    }

    /// Appends the WHERE clause (soft-deleted rows always excluded) to a Postgres query
    pub fn push_filters(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" WHERE deleted_at IS NULL");

        if let Some(players) = &self.players {
            builder.push(" AND player = ANY(");
            builder.push_bind(players.clone());
            builder.push(")");
        }

        match self.created_at {
            Some(CreatedAtFilter::After(start)) => {
                builder.push(" AND created_at > ");
                builder.push_bind(start);
            }
            Some(CreatedAtFilter::Before(end)) => {
                builder.push(" AND created_at < ");
                builder.push_bind(end);
            }
            Some(CreatedAtFilter::Between(start, end)) => {
                builder.push(" AND created_at BETWEEN ");
                builder.push_bind(start);
                builder.push(" AND ");
                builder.push_bind(end);
            }
            None => {}
        }
    }

    /// Appends ordering by id and the LIMIT/OFFSET window
    pub fn push_window(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" ORDER BY id ");
        builder.push(self.order.as_sql());
        builder.push(" LIMIT ");
        builder.push_bind(self.limit());
        builder.push(" OFFSET ");
        builder.push_bind(self.offset());
    }

    /// Page size as a SQL bigint, saturating at `i64::MAX`
    pub fn limit(&self) -> i64 {
        i64::try_from(self.take).unwrap_or(i64::MAX)
    }

    /// Rows to skip as a SQL bigint, saturating at `i64::MAX`
    pub fn offset(&self) -> i64 {
        i64::try_from(self.skip).unwrap_or(i64::MAX)
    }
}
