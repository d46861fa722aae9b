//! Process-local [`SearchStore`] for tests and dry runs.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bizlens_core::{NewSearchRecord, SearchRecord, SearchStore, StoreError};
use chrono::{DateTime, Utc};

#[derive(Debug, Default)]
pub struct InMemorySearchStore {
    records: Mutex<Vec<SearchRecord>>,
}

impl InMemorySearchStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fully-formed record, keeping its id and `created_at`.
    pub fn insert_raw(&self, record: SearchRecord) {
        self.lock().push(record);
    }

    /// Every stored record in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SearchRecord> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SearchRecord>> {
        // Records are plain data; a panic mid-push cannot leave them torn.
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn newest_first(mut records: Vec<SearchRecord>) -> Vec<SearchRecord> {
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        records
    }
}

#[async_trait]
impl SearchStore for InMemorySearchStore {
    async fn save_search_record(
        &self,
        record: NewSearchRecord,
    ) -> Result<SearchRecord, StoreError> {
        let mut records = self.lock();
        let id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let saved = SearchRecord {
            id,
            searcher_user_id: record.searcher_user_id,
            target_username: record.target_username,
            target_instagram_id: record.target_instagram_id,
            search_result: record.search_result,
            status: record.status,
            error_message: record.error_message,
            created_at: Utc::now(),
        };
        records.push(saved.clone());
        Ok(saved)
    }

    async fn find_latest_record(
        &self,
        searcher_user_id: i64,
        target_username: &str,
    ) -> Result<Option<SearchRecord>, StoreError> {
        let matching: Vec<SearchRecord> = self
            .lock()
            .iter()
            .filter(|r| r.searcher_user_id == searcher_user_id && r.target_username == target_username)
            .cloned()
            .collect();
        Ok(Self::newest_first(matching).into_iter().next())
    }

    async fn find_records_since(
        &self,
        searcher_user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Vec<SearchRecord>, StoreError> {
        let matching: Vec<SearchRecord> = self
            .lock()
            .iter()
            .filter(|r| r.searcher_user_id == searcher_user_id && r.created_at >= since)
            .cloned()
            .collect();
        Ok(Self::newest_first(matching))
    }

    async fn count_records_since(
        &self,
        searcher_user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let count = self
            .lock()
            .iter()
            .filter(|r| r.searcher_user_id == searcher_user_id && r.created_at >= since)
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn find_all_by_searcher(
        &self,
        searcher_user_id: i64,
    ) -> Result<Vec<SearchRecord>, StoreError> {
        let matching: Vec<SearchRecord> = self
            .lock()
            .iter()
            .filter(|r| r.searcher_user_id == searcher_user_id)
            .cloned()
            .collect();
        Ok(Self::newest_first(matching))
    }
}
