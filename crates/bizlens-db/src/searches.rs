//! Database operations for the `discovery_searches` table.

use async_trait::async_trait;
use bizlens_core::{NewSearchRecord, SearchRecord, SearchStatus, SearchStore, StoreError};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

const SEARCH_COLUMNS: &str = "id, searcher_user_id, target_username, target_instagram_id, \
     search_result, search_status, error_message, created_at";

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `discovery_searches` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SearchRow {
    pub id: i64,
    pub searcher_user_id: i64,
    pub target_username: String,
    pub target_instagram_id: Option<String>,
    pub search_result: Option<String>,
    pub search_status: String,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<SearchRow> for SearchRecord {
    type Error = DbError;

    fn try_from(row: SearchRow) -> Result<Self, Self::Error> {
        let status = row
            .search_status
            .parse::<SearchStatus>()
            .map_err(|reason| DbError::InvalidColumn {
                column: "search_status",
                reason,
            })?;
        Ok(SearchRecord {
            id: row.id,
            searcher_user_id: row.searcher_user_id,
            target_username: row.target_username,
            target_instagram_id: row.target_instagram_id,
            search_result: row.search_result,
            status,
            error_message: row.error_message,
            created_at: row.created_at,
        })
    }
}

fn into_records(rows: Vec<SearchRow>) -> Result<Vec<SearchRecord>, DbError> {
    rows.into_iter().map(SearchRecord::try_from).collect()
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// [`SearchStore`] backed by Postgres.
#[derive(Debug, Clone)]
pub struct PgSearchStore {
    pool: PgPool,
}

impl PgSearchStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, record: NewSearchRecord) -> Result<SearchRecord, DbError> {
        let row = sqlx::query_as::<_, SearchRow>(&format!(
            "INSERT INTO discovery_searches \
                 (searcher_user_id, target_username, target_instagram_id, \
                  search_result, search_status, error_message) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {SEARCH_COLUMNS}"
        ))
        .bind(record.searcher_user_id)
        .bind(&record.target_username)
        .bind(&record.target_instagram_id)
        .bind(&record.search_result)
        .bind(record.status.as_str())
        .bind(&record.error_message)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn latest(
        &self,
        searcher_user_id: i64,
        target_username: &str,
    ) -> Result<Option<SearchRecord>, DbError> {
        let row = sqlx::query_as::<_, SearchRow>(&format!(
            "SELECT {SEARCH_COLUMNS} \
             FROM discovery_searches \
             WHERE searcher_user_id = $1 AND target_username = $2 \
             ORDER BY created_at DESC, id DESC \
             LIMIT 1"
        ))
        .bind(searcher_user_id)
        .bind(target_username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SearchRecord::try_from).transpose()
    }

    async fn since(
        &self,
        searcher_user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Vec<SearchRecord>, DbError> {
        let rows = sqlx::query_as::<_, SearchRow>(&format!(
            "SELECT {SEARCH_COLUMNS} \
             FROM discovery_searches \
             WHERE searcher_user_id = $1 AND created_at >= $2 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(searcher_user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        into_records(rows)
    }

    async fn count_since(
        &self,
        searcher_user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<u64, DbError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM discovery_searches \
             WHERE searcher_user_id = $1 AND created_at >= $2",
        )
        .bind(searcher_user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn all(&self, searcher_user_id: i64) -> Result<Vec<SearchRecord>, DbError> {
        let rows = sqlx::query_as::<_, SearchRow>(&format!(
            "SELECT {SEARCH_COLUMNS} \
             FROM discovery_searches \
             WHERE searcher_user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(searcher_user_id)
        .fetch_all(&self.pool)
        .await?;

        into_records(rows)
    }
}

#[async_trait]
impl SearchStore for PgSearchStore {
    async fn save_search_record(
        &self,
        record: NewSearchRecord,
    ) -> Result<SearchRecord, StoreError> {
        Ok(self.insert(record).await?)
    }

    async fn find_latest_record(
        &self,
        searcher_user_id: i64,
        target_username: &str,
    ) -> Result<Option<SearchRecord>, StoreError> {
        Ok(self.latest(searcher_user_id, target_username).await?)
    }

    async fn find_records_since(
        &self,
        searcher_user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Vec<SearchRecord>, StoreError> {
        Ok(self.since(searcher_user_id, since).await?)
    }

    async fn count_records_since(
        &self,
        searcher_user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        Ok(self.count_since(searcher_user_id, since).await?)
    }

    async fn find_all_by_searcher(
        &self,
        searcher_user_id: i64,
    ) -> Result<Vec<SearchRecord>, StoreError> {
        Ok(self.all(searcher_user_id).await?)
    }
}
