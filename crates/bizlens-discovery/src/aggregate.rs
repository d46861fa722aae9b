//! Engagement metrics.
//!
//! A post's engagement rate is `(likes + comments + saves) / followers * 100`.
//! Account-level averages divide the mean interactions per post by the
//! follower count. Unknown counters contribute zero.

use bizlens_core::{AccessToken, AccountAnalysis, AccountInsights, PostEngagement, PostRecord};
use bizlens_graph::GraphClient;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt, TryStreamExt};

use crate::error::DiscoveryError;

pub const DEFAULT_ANALYSIS_CONCURRENCY: usize = 1;

/// Engagement rate in percent, or `None` when the follower count is zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn engagement_rate(interactions: u64, followers: u64) -> Option<f64> {
    if followers == 0 {
        return None;
    }
    Some(interactions as f64 / followers as f64 * 100.0)
}

/// Fills `engagement_rate` on each post. Posts are left unscored when the
/// follower count is unknown or zero.
pub fn score_posts(posts: &mut [PostRecord], followers: Option<u64>) {
    for post in posts {
        post.engagement_rate = followers.and_then(|f| engagement_rate(post.interactions(), f));
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Totals {
    likes: u64,
    comments: u64,
    saves: u64,
    posts: usize,
}

impl Totals {
    fn add(&mut self, likes: Option<u64>, comments: Option<u64>, saves: Option<u64>) {
        self.likes = self.likes.saturating_add(likes.unwrap_or(0));
        self.comments = self.comments.saturating_add(comments.unwrap_or(0));
        self.saves = self.saves.saturating_add(saves.unwrap_or(0));
        self.posts += 1;
    }

    fn interactions(self) -> u64 {
        self.likes
            .saturating_add(self.comments)
            .saturating_add(self.saves)
    }

    /// `((likes + comments + saves) / posts) / followers * 100`.
    #[allow(clippy::cast_precision_loss)]
    fn average_rate(self, followers: u64) -> f64 {
        if self.posts == 0 || followers == 0 {
            return 0.0;
        }
        let per_post = self.interactions() as f64 / self.posts as f64;
        per_post / followers as f64 * 100.0
    }
}

/// Account-level insights over already-fetched posts.
///
/// `None` when there are no posts or the follower count is unknown or zero.
#[must_use]
pub fn account_insights(posts: &[PostRecord], followers: Option<u64>) -> Option<AccountInsights> {
    let followers = followers.filter(|f| *f > 0)?;
    if posts.is_empty() {
        return None;
    }

    let mut totals = Totals::default();
    for post in posts {
        totals.add(post.like_count, post.comments_count, post.saved_count);
    }

    Some(AccountInsights {
        average_engagement_rate: totals.average_rate(followers),
        total_likes: totals.likes,
        total_comments: totals.comments,
        total_saves: totals.saves,
        post_count: totals.posts,
    })
}

fn reduce_details(
    details: &[PostEngagement],
    followers: u64,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> AccountAnalysis {
    let mut totals = Totals::default();
    for detail in details {
        totals.add(detail.like_count, detail.comments_count, detail.saved_count);
    }

    AccountAnalysis {
        post_count: totals.posts,
        total_likes: totals.likes,
        total_comments: totals.comments,
        total_saves: totals.saves,
        average_engagement_rate: totals.average_rate(followers),
        followers_at_time_of_analysis: followers,
        start_date,
        end_date,
    }
}

/// Computes an [`AccountAnalysis`] for an account's own posts in a date range.
pub struct EngagementAggregator<'a> {
    client: &'a GraphClient,
    concurrency: usize,
}

impl<'a> EngagementAggregator<'a> {
    /// `concurrency` bounds in-flight per-post detail calls; `1` (or `0`)
    /// fetches them one at a time.
    #[must_use]
    pub fn new(client: &'a GraphClient, concurrency: usize) -> Self {
        Self {
            client,
            concurrency: concurrency.max(1),
        }
    }

    /// Aggregates engagement over posts created in `[start_date, end_date]`.
    ///
    /// A zero or unknown follower count yields an empty analysis after the
    /// profile call alone. Detail results keep the upstream post order
    /// regardless of concurrency.
    ///
    /// # Errors
    ///
    /// - [`DiscoveryError::InvalidDateRange`] if `start_date > end_date`,
    ///   before any upstream call.
    /// - [`DiscoveryError::Graph`] from any upstream call. A single failed
    ///   detail fetch aborts the whole aggregation.
    pub async fn aggregate(
        &self,
        account_id: &str,
        token: &AccessToken,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<AccountAnalysis, DiscoveryError> {
        let invalid_range = || DiscoveryError::InvalidDateRange {
            start: start_date,
            end: end_date,
        };
        if start_date > end_date {
            return Err(invalid_range());
        }
        let until = end_date.succ_opt().ok_or_else(invalid_range)?;

        let profile = self.client.get_profile(account_id, token).await?;
        let followers = match profile.followers_count {
            Some(f) if f > 0 => f,
            _ => {
                tracing::info!(account_id, "account has no followers; skipping analysis");
                return Ok(AccountAnalysis::empty(0, start_date, end_date));
            }
        };

        let post_ids = self
            .client
            .list_post_ids_in_range(account_id, token, start_date, until)
            .await?;
        if post_ids.is_empty() {
            tracing::info!(account_id, %start_date, %end_date, "no posts in range");
            return Ok(AccountAnalysis::empty(followers, start_date, end_date));
        }

        let details = self.fetch_post_details(&post_ids, token).await?;
        let analysis = reduce_details(&details, followers, start_date, end_date);
        tracing::info!(
            account_id,
            posts = analysis.post_count,
            average_engagement_rate = analysis.average_engagement_rate,
            "account analysis complete"
        );
        Ok(analysis)
    }

    /// Fetches detail counters for each post, at most `concurrency` at a
    /// time. The output follows `post_ids` order regardless of completion
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Graph`] for the first failed fetch; no
    /// further posts are requested once it surfaces.
    pub async fn fetch_post_details(
        &self,
        post_ids: &[String],
        token: &AccessToken,
    ) -> Result<Vec<PostEngagement>, DiscoveryError> {
        let details: Vec<PostEngagement> = stream::iter(post_ids)
            .map(|post_id| self.client.get_post_detail(post_id, token))
            .buffered(self.concurrency)
            .try_collect()
            .await?;
        Ok(details)
    }
}
