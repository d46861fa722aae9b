//! Orchestration of discovery, analysis and search history.

use std::sync::Arc;
use std::time::Duration;

use bizlens_core::{
    AccountAnalysis, AppConfig, DiscoveryResult, NewSearchRecord, ProfileSnapshot, SearchRecord,
    SearchStatistics, SearchStatus, SearchStore, UserAccount,
};
use bizlens_graph::{normalize_username, AccountResolver, GraphClient, ResolvedIdentity};
use chrono::{NaiveDate, Utc};

use crate::aggregate::{
    account_insights, score_posts, EngagementAggregator, DEFAULT_ANALYSIS_CONCURRENCY,
};
use crate::cache::{DiscoveryCache, DEFAULT_CACHE_TTL};
use crate::error::DiscoveryError;
use crate::rate_limit::{RateLimiter, DEFAULT_HOURLY_QUOTA};

/// Window for [`DiscoveryService::recent_searches`].
const RECENT_SEARCH_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy)]
pub struct DiscoverySettings {
    pub hourly_quota: u32,
    pub cache_ttl: Duration,
    pub analysis_concurrency: usize,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            hourly_quota: DEFAULT_HOURLY_QUOTA,
            cache_ttl: DEFAULT_CACHE_TTL,
            analysis_concurrency: DEFAULT_ANALYSIS_CONCURRENCY,
        }
    }
}

impl DiscoverySettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            hourly_quota: config.hourly_search_quota,
            cache_ttl: Duration::from_secs(config.cache_ttl_secs),
            analysis_concurrency: config.analysis_concurrency,
        }
    }
}

/// A user who completed the OAuth login: the resolved identity and the
/// profile of their business account.
#[derive(Debug, Clone)]
pub struct AuthenticatedAccount {
    pub identity: ResolvedIdentity,
    pub profile: ProfileSnapshot,
}

pub struct DiscoveryService {
    client: GraphClient,
    store: Arc<dyn SearchStore>,
    rate_limiter: RateLimiter,
    cache: DiscoveryCache,
    analysis_concurrency: usize,
}

impl DiscoveryService {
    #[must_use]
    pub fn new(client: GraphClient, store: Arc<dyn SearchStore>, settings: DiscoverySettings) -> Self {
        Self {
            rate_limiter: RateLimiter::new(Arc::clone(&store), settings.hourly_quota),
            cache: DiscoveryCache::new(Arc::clone(&store), settings.cache_ttl),
            client,
            store,
            analysis_concurrency: settings.analysis_concurrency,
        }
    }

    /// Resolves an authorization code and fetches the resolved account's
    /// profile. Persisting the user is left to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Graph`] from any step of the chain.
    pub async fn authenticate(&self, code: &str) -> Result<AuthenticatedAccount, DiscoveryError> {
        let identity = AccountResolver::new(&self.client).resolve(code).await?;
        let profile = self
            .client
            .get_profile(&identity.business_account_id, &identity.access_token)
            .await?;
        tracing::info!(
            business_account_id = %identity.business_account_id,
            username = profile.username.as_deref().unwrap_or(""),
            "user authenticated"
        );
        Ok(AuthenticatedAccount { identity, profile })
    }

    /// Looks up a public business account on behalf of `searcher`.
    ///
    /// Quota is checked first, then the cache. A cache miss calls upstream,
    /// scores the returned posts and appends one history record: SUCCESS
    /// with the serialized result, or FAILED with the error message.
    ///
    /// # Errors
    ///
    /// - [`DiscoveryError::RateLimitExceeded`] before any upstream call.
    /// - [`DiscoveryError::Graph`] if the discovery call fails.
    /// - [`DiscoveryError::Store`] if history cannot be read or the success
    ///   record cannot be written. A FAILED record is still attempted in the
    ///   latter case.
    pub async fn discover(
        &self,
        searcher: &UserAccount,
        target_username: &str,
        include_media: bool,
    ) -> Result<DiscoveryResult, DiscoveryError> {
        let target = normalize_username(target_username);
        tracing::info!(
            searcher_user_id = searcher.id,
            target_username = %target,
            include_media,
            "business discovery requested"
        );

        if !self.rate_limiter.check_and_admit(searcher.id).await? {
            tracing::warn!(searcher_user_id = searcher.id, "hourly search quota exhausted");
            return Err(DiscoveryError::RateLimitExceeded {
                quota: self.rate_limiter.quota(),
            });
        }

        if let Some(cached) = self
            .cache
            .lookup(searcher.id, &target, include_media)
            .await?
        {
            tracing::info!(target_username = %target, "returning cached discovery result");
            return Ok(cached);
        }

        match self.fetch_and_score(searcher, &target, include_media).await {
            Ok(result) => match self.record_success(searcher.id, &target, &result).await {
                Ok(()) => Ok(result),
                Err(err) => {
                    tracing::error!(target_username = %target, error = %err, "failed to record successful search");
                    self.record_failure_best_effort(searcher.id, &target, &err)
                        .await;
                    Err(err)
                }
            },
            Err(err) => {
                tracing::error!(target_username = %target, error = %err, "business discovery failed");
                self.record_failure_best_effort(searcher.id, &target, &err)
                    .await;
                Err(err)
            }
        }
    }

    async fn fetch_and_score(
        &self,
        searcher: &UserAccount,
        target: &str,
        include_media: bool,
    ) -> Result<DiscoveryResult, DiscoveryError> {
        let mut result = self
            .client
            .discover_account(
                &searcher.instagram_id,
                target,
                &searcher.access_token,
                include_media,
            )
            .await?;

        let followers = result.profile.followers_count;
        score_posts(&mut result.posts, followers);
        result.insights = account_insights(&result.posts, followers);
        Ok(result)
    }

    async fn record_success(
        &self,
        searcher_user_id: i64,
        target: &str,
        result: &DiscoveryResult,
    ) -> Result<(), DiscoveryError> {
        let payload = match serde_json::to_string(result) {
            Ok(json) => Some(json),
            Err(e) => {
                tracing::error!(target_username = target, error = %e, "failed to serialize search result");
                None
            }
        };
        let record = NewSearchRecord::success(
            searcher_user_id,
            target,
            Some(result.profile.id.clone()),
            payload,
        );
        let saved = self.store.save_search_record(record).await?;
        tracing::debug!(record_id = saved.id, target_username = target, "saved successful search");
        Ok(())
    }

    async fn record_failure_best_effort(
        &self,
        searcher_user_id: i64,
        target: &str,
        err: &DiscoveryError,
    ) {
        let record = NewSearchRecord::failed(searcher_user_id, target, err.to_string());
        if let Err(store_err) = self.store.save_search_record(record).await {
            tracing::error!(
                searcher_user_id,
                target_username = target,
                error = %store_err,
                "failed to record failed search"
            );
        }
    }

    /// Engagement analysis of the searcher's own account. Not cached, not
    /// rate limited and not written to history.
    ///
    /// # Errors
    ///
    /// See [`EngagementAggregator::aggregate`].
    pub async fn analyze(
        &self,
        searcher: &UserAccount,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<AccountAnalysis, DiscoveryError> {
        EngagementAggregator::new(&self.client, self.analysis_concurrency)
            .aggregate(
                &searcher.instagram_id,
                &searcher.access_token,
                start_date,
                end_date,
            )
            .await
    }

    /// Every search by `searcher_user_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Store`] if the query fails.
    pub async fn history(&self, searcher_user_id: i64) -> Result<Vec<SearchRecord>, DiscoveryError> {
        Ok(self.store.find_all_by_searcher(searcher_user_id).await?)
    }

    /// Searches from the trailing 24 hours, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Store`] if the query fails.
    pub async fn recent_searches(
        &self,
        searcher_user_id: i64,
    ) -> Result<Vec<SearchRecord>, DiscoveryError> {
        let since = Utc::now() - chrono::Duration::hours(RECENT_SEARCH_HOURS);
        Ok(self.store.find_records_since(searcher_user_id, since).await?)
    }

    /// Lifetime totals plus the current hourly quota position.
    ///
    /// Anything not SUCCESS counts as failed.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Store`] if a query fails.
    pub async fn statistics(&self, searcher_user_id: i64) -> Result<SearchStatistics, DiscoveryError> {
        let all = self.store.find_all_by_searcher(searcher_user_id).await?;
        let total = u64::try_from(all.len()).unwrap_or(u64::MAX);
        let successful = u64::try_from(
            all.iter()
                .filter(|r| r.status == SearchStatus::Success)
                .count(),
        )
        .unwrap_or(u64::MAX);
        let recent = self.rate_limiter.recent_count(searcher_user_id).await?;

        Ok(SearchStatistics {
            total_searches: total,
            successful_searches: successful,
            failed_searches: total.saturating_sub(successful),
            recent_searches: recent,
            remaining_searches: self.rate_limiter.remaining(recent),
        })
    }
}
