//! Hourly search quota per searcher, counted from search history.
//!
//! The count and the eventual history write are separate store calls, so
//! concurrent submissions from one searcher can overshoot the quota by the
//! number of requests in flight.

use std::sync::Arc;

use bizlens_core::SearchStore;
use chrono::{DateTime, Duration, Utc};

use crate::error::DiscoveryError;

pub const DEFAULT_HOURLY_QUOTA: u32 = 200;

/// Trailing window over which searches count against the quota.
fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(1)
}

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn SearchStore>,
    quota: u32,
}

impl RateLimiter {
    #[must_use]
    pub fn new(store: Arc<dyn SearchStore>, quota: u32) -> Self {
        Self { store, quota }
    }

    #[must_use]
    pub fn quota(&self) -> u32 {
        self.quota
    }

    /// Searches recorded for `searcher_user_id` within the trailing hour.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Store`] if the count query fails.
    pub async fn recent_count(&self, searcher_user_id: i64) -> Result<u64, DiscoveryError> {
        let since = window_start(Utc::now());
        Ok(self
            .store
            .count_records_since(searcher_user_id, since)
            .await?)
    }

    /// Returns `true` when the searcher is below the hourly quota.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Store`] if the count query fails.
    pub async fn check_and_admit(&self, searcher_user_id: i64) -> Result<bool, DiscoveryError> {
        let recent = self.recent_count(searcher_user_id).await?;
        let allowed = recent < u64::from(self.quota);
        tracing::debug!(
            searcher_user_id,
            recent,
            quota = self.quota,
            allowed,
            "rate limit check"
        );
        Ok(allowed)
    }

    /// Quota left given `recent` searches in the window, floored at zero.
    #[must_use]
    pub fn remaining(&self, recent: u64) -> u64 {
        u64::from(self.quota).saturating_sub(recent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemorySearchStore;
    use bizlens_core::{NewSearchRecord, SearchRecord, SearchStatus};

    fn seeded_store(searcher: i64, ages_in_minutes: &[i64]) -> Arc<InMemorySearchStore> {
        let store = Arc::new(InMemorySearchStore::new());
        let now = Utc::now();
        for (i, age) in ages_in_minutes.iter().enumerate() {
            store.insert_raw(SearchRecord {
                id: i64::try_from(i).unwrap() + 1,
                searcher_user_id: searcher,
                target_username: "acme".to_string(),
                target_instagram_id: None,
                search_result: None,
                status: SearchStatus::Failed,
                error_message: Some("boom".to_string()),
                created_at: now - Duration::minutes(*age),
            });
        }
        store
    }

    #[tokio::test]
    async fn admits_below_quota() {
        let store = seeded_store(1, &[5, 10]);
        let limiter = RateLimiter::new(store, 3);
        assert!(limiter.check_and_admit(1).await.unwrap());
    }

    #[tokio::test]
    async fn rejects_at_quota() {
        let store = seeded_store(1, &[5, 10, 15]);
        let limiter = RateLimiter::new(store, 3);
        assert!(!limiter.check_and_admit(1).await.unwrap());
    }

    #[tokio::test]
    async fn ignores_searches_older_than_an_hour_and_other_searchers() {
        let store = seeded_store(1, &[61, 120, 5]);
        store
            .save_search_record(NewSearchRecord::failed(2, "acme", "x".to_string()))
            .await
            .unwrap();
        let limiter = RateLimiter::new(store, 2);
        assert_eq!(limiter.recent_count(1).await.unwrap(), 1);
        assert!(limiter.check_and_admit(1).await.unwrap());
    }

    #[test]
    fn remaining_floors_at_zero() {
        let limiter = RateLimiter::new(Arc::new(InMemorySearchStore::new()), 200);
        assert_eq!(limiter.remaining(150), 50);
        assert_eq!(limiter.remaining(250), 0);
    }
}
