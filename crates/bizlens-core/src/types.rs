//! Domain types shared by the Graph client, the discovery pipeline and
//! persistence.
//!
//! Upstream counters are `Option<u64>` throughout: an absent field means
//! "unknown", which aggregation must keep distinct from zero.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::token::AccessToken;

// ---------------------------------------------------------------------------
// Upstream projections
// ---------------------------------------------------------------------------

/// Public profile of an Instagram business or creator account at fetch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub id: String,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub biography: Option<String>,
    pub followers_count: Option<u64>,
    pub follows_count: Option<u64>,
    pub media_count: Option<u64>,
    pub profile_picture_url: Option<String>,
    pub website: Option<String>,
}

/// A single media post. `engagement_rate` is derived locally, never read
/// from upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: String,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
    pub caption: Option<String>,
    pub like_count: Option<u64>,
    pub comments_count: Option<u64>,
    pub saved_count: Option<u64>,
    pub timestamp: Option<String>,
    pub permalink: Option<String>,
    pub engagement_rate: Option<f64>,
}

impl PostRecord {
    /// Likes + comments + saves, counting unknown values as zero.
    #[must_use]
    pub fn interactions(&self) -> u64 {
        self.like_count
            .unwrap_or(0)
            .saturating_add(self.comments_count.unwrap_or(0))
            .saturating_add(self.saved_count.unwrap_or(0))
    }
}

/// Engagement counters for one post, as returned by the per-post detail call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostEngagement {
    pub id: String,
    pub like_count: Option<u64>,
    pub comments_count: Option<u64>,
    pub saved_count: Option<u64>,
}


// ---------------------------------------------------------------------------
// Derived analytics
// ---------------------------------------------------------------------------

/// Account-level reduction over a set of posts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInsights {
    pub average_engagement_rate: f64,
    pub total_likes: u64,
    pub total_comments: u64,
    pub total_saves: u64,
    pub post_count: usize,
}

/// Outcome of a business discovery lookup: the target's profile, its recent
/// posts (empty unless media was requested), and insights when computable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub profile: ProfileSnapshot,
    #[serde(default)]
    pub posts: Vec<PostRecord>,
    pub insights: Option<AccountInsights>,
}

/// Engagement analysis of the caller's own account over `[start_date, end_date]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountAnalysis {
    pub post_count: usize,
    pub total_likes: u64,
    pub total_comments: u64,
    pub total_saves: u64,
    pub average_engagement_rate: f64,
    pub followers_at_time_of_analysis: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl AccountAnalysis {
    /// An analysis with no posts and zeroed totals.
    #[must_use]
    pub fn empty(followers: u64, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            post_count: 0,
            total_likes: 0,
            total_comments: 0,
            total_saves: 0,
            average_engagement_rate: 0.0,
            followers_at_time_of_analysis: followers,
            start_date,
            end_date,
        }
    }
}

// ---------------------------------------------------------------------------
// Search history
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchStatus {
    Success,
    Failed,
    Pending,
}

impl SearchStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SearchStatus::Success => "SUCCESS",
            SearchStatus::Failed => "FAILED",
            SearchStatus::Pending => "PENDING",
        }
    }
}

impl std::fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SearchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(SearchStatus::Success),
            "FAILED" => Ok(SearchStatus::Failed),
            "PENDING" => Ok(SearchStatus::Pending),
            other => Err(format!("unknown search status '{other}'")),
        }
    }
}

/// A persisted discovery attempt. Doubles as cache entry and audit history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRecord {
    pub id: i64,
    pub searcher_user_id: i64,
    pub target_username: String,
    pub target_instagram_id: Option<String>,
    /// JSON-serialized [`DiscoveryResult`].
    pub search_result: Option<String>,
    pub status: SearchStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a [`SearchRecord`]; the store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSearchRecord {
    pub searcher_user_id: i64,
    pub target_username: String,
    pub target_instagram_id: Option<String>,
    pub search_result: Option<String>,
    pub status: SearchStatus,
    pub error_message: Option<String>,
}

impl NewSearchRecord {
    #[must_use]
    pub fn success(
        searcher_user_id: i64,
        target_username: &str,
        target_instagram_id: Option<String>,
        search_result: Option<String>,
    ) -> Self {
        Self {
            searcher_user_id,
            target_username: target_username.to_string(),
            target_instagram_id,
            search_result,
            status: SearchStatus::Success,
            error_message: None,
        }
    }

    #[must_use]
    pub fn failed(searcher_user_id: i64, target_username: &str, error_message: String) -> Self {
        Self {
            searcher_user_id,
            target_username: target_username.to_string(),
            target_instagram_id: None,
            search_result: None,
            status: SearchStatus::Failed,
            error_message: Some(error_message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStatistics {
    pub total_searches: u64,
    pub successful_searches: u64,
    pub failed_searches: u64,
    pub recent_searches: u64,
    pub remaining_searches: u64,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// An authenticated user: the searcher identity for discovery and analysis.
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub id: i64,
    /// Instagram business account id obtained through the page linkage.
    pub instagram_id: String,
    pub username: String,
    pub full_name: Option<String>,
    pub biography: Option<String>,
    pub profile_picture_url: Option<String>,
    pub followers_count: Option<u64>,
    pub follows_count: Option<u64>,
    pub media_count: Option<u64>,
    pub access_token: AccessToken,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
