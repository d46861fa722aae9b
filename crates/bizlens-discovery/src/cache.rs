//! Read-through view of search history as a per-target result cache.
//!
//! Only the newest record for `(searcher, target)` is consulted. The cache
//! never writes; the orchestrator appends exactly one record per attempt.

use std::sync::Arc;
use std::time::Duration;

use bizlens_core::{DiscoveryResult, SearchRecord, SearchStatus, SearchStore};
use chrono::{DateTime, Utc};

use crate::error::DiscoveryError;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

#[derive(Clone)]
pub struct DiscoveryCache {
    store: Arc<dyn SearchStore>,
    ttl: Duration,
}

impl DiscoveryCache {
    #[must_use]
    pub fn new(store: Arc<dyn SearchStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Returns the cached result for `target_username`, if the newest record
    /// is a fresh success with a payload.
    ///
    /// With `include_media`, an entry cached without posts is a miss, since
    /// it may come from a profile-only lookup. An undecodable payload is
    /// logged and treated as a miss.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Store`] if the history lookup fails.
    pub async fn lookup(
        &self,
        searcher_user_id: i64,
        target_username: &str,
        include_media: bool,
    ) -> Result<Option<DiscoveryResult>, DiscoveryError> {
        let Some(record) = self
            .store
            .find_latest_record(searcher_user_id, target_username)
            .await?
        else {
            return Ok(None);
        };

        let Some(payload) = usable_payload(&record, Utc::now(), self.ttl) else {
            tracing::debug!(target_username, record_id = record.id, "cache miss");
            return Ok(None);
        };

        match serde_json::from_str::<DiscoveryResult>(payload) {
            Ok(result) if include_media && result.posts.is_empty() => {
                tracing::debug!(
                    target_username,
                    record_id = record.id,
                    "cached entry has no media; treating as miss"
                );
                Ok(None)
            }
            Ok(result) => {
                tracing::debug!(target_username, record_id = record.id, "cache hit");
                Ok(Some(result))
            }
            Err(e) => {
                tracing::warn!(
                    target_username,
                    record_id = record.id,
                    error = %e,
                    "failed to deserialize cached result; ignoring entry"
                );
                Ok(None)
            }
        }
    }
}

/// The record's payload when it is a successful search younger than `ttl`.
///
/// A `created_at` in the future counts as age zero.
fn usable_payload(record: &SearchRecord, now: DateTime<Utc>, ttl: Duration) -> Option<&str> {
    if record.status != SearchStatus::Success {
        return None;
    }
    let age = (now - record.created_at).to_std().unwrap_or(Duration::ZERO);
    if age >= ttl {
        return None;
    }
    record.search_result.as_deref()
}
