//! Persistence seam for search history.
//!
//! The discovery pipeline only talks to storage through [`SearchStore`], so
//! the Postgres adapter and the in-memory adapter are interchangeable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::{NewSearchRecord, SearchRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("invalid stored value: {0}")]
    InvalidValue(String),
}

/// Append-only history of discovery attempts, keyed by searcher.
#[async_trait]
pub trait SearchStore: Send + Sync {
    /// Persists one attempt and returns it with its assigned id and timestamp.
    async fn save_search_record(&self, record: NewSearchRecord)
        -> Result<SearchRecord, StoreError>;

    /// The most recent record for `(searcher, target)`, latest `created_at`
    /// first with ties broken by the highest id.
    async fn find_latest_record(
        &self,
        searcher_user_id: i64,
        target_username: &str,
    ) -> Result<Option<SearchRecord>, StoreError>;

    /// Records created at or after `since`, newest first.
    async fn find_records_since(
        &self,
        searcher_user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Vec<SearchRecord>, StoreError>;

    async fn count_records_since(
        &self,
        searcher_user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Every record for the searcher, newest first.
    async fn find_all_by_searcher(
        &self,
        searcher_user_id: i64,
    ) -> Result<Vec<SearchRecord>, StoreError>;
}
