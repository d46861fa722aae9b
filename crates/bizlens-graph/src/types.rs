//! Graph API response shapes.
//!
//! Every upstream field is optional: Graph omits fields the token is not
//! permitted to read, and a missing counter must stay `None` rather than
//! collapse to zero.

use bizlens_core::{PostEngagement, PostRecord, ProfileSnapshot};
use serde::Deserialize;

/// Metric name for the lifetime saves insight.
const SAVED_METRIC: &str = "saved";

// ---------------------------------------------------------------------------
// OAuth / page linkage
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
}

/// `GET /me/accounts`: `{ "data": [ { "id": ..., "name": ... } ] }`.
#[derive(Debug, Deserialize)]
pub(crate) struct AccountsResponse {
    #[serde(default)]
    pub data: Option<Vec<ManagedPage>>,
}

/// A Facebook page managed by the token owner.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManagedPage {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PageLinkResponse {
    #[serde(default)]
    pub instagram_business_account: Option<NodeRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NodeRef {
    pub id: String,
}

// ---------------------------------------------------------------------------
// Profiles and business discovery
// ---------------------------------------------------------------------------

/// Wrapper for `?fields=business_discovery.username(x){...}`.
#[derive(Debug, Deserialize)]
pub(crate) struct DiscoveryEnvelope {
    #[serde(default)]
    pub business_discovery: Option<GraphAccount>,
}

/// An Instagram user node, either the caller's own or a discovered one.
#[derive(Debug, Deserialize)]
pub(crate) struct GraphAccount {
    pub id: String,
    pub username: Option<String>,
    pub name: Option<String>,
    pub biography: Option<String>,
    pub followers_count: Option<u64>,
    pub follows_count: Option<u64>,
    pub media_count: Option<u64>,
    pub profile_picture_url: Option<String>,
    pub website: Option<String>,
    #[serde(default)]
    pub media: Option<MediaPage>,
}

impl GraphAccount {
    /// Splits the node into its profile and its raw (unscored) posts.
    pub(crate) fn into_parts(self) -> (ProfileSnapshot, Vec<PostRecord>) {
        let posts = self
            .media
            .map(|page| page.data.into_iter().map(GraphMedia::into_post).collect())
            .unwrap_or_default();
        let profile = ProfileSnapshot {
            id: self.id,
            username: self.username,
            display_name: self.name,
            biography: self.biography,
            followers_count: self.followers_count,
            follows_count: self.follows_count,
            media_count: self.media_count,
            profile_picture_url: self.profile_picture_url,
            website: self.website,
        };
        (profile, posts)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct MediaPage {
    #[serde(default)]
    pub data: Vec<GraphMedia>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphMedia {
    pub id: String,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
    pub caption: Option<String>,
    pub like_count: Option<u64>,
    pub comments_count: Option<u64>,
    pub timestamp: Option<String>,
    pub permalink: Option<String>,
    #[serde(default)]
    pub insights: Option<InsightsPage>,
}

impl GraphMedia {
    fn saved_count(&self) -> Option<u64> {
        self.insights.as_ref()?.metric_value(SAVED_METRIC)
    }

    pub(crate) fn into_post(self) -> PostRecord {
        let saved_count = self.saved_count();
        PostRecord {
            id: self.id,
            media_url: self.media_url,
            media_type: self.media_type,
            caption: self.caption,
            like_count: self.like_count,
            comments_count: self.comments_count,
            saved_count,
            timestamp: self.timestamp,
            permalink: self.permalink,
            engagement_rate: None,
        }
    }

    pub(crate) fn into_engagement(self) -> PostEngagement {
        let saved_count = self.saved_count();
        PostEngagement {
            id: self.id,
            like_count: self.like_count,
            comments_count: self.comments_count,
            saved_count,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct InsightsPage {
    #[serde(default)]
    pub data: Vec<InsightMetric>,
}

impl InsightsPage {
    /// First value of the named lifetime metric, if reported.
    fn metric_value(&self, name: &str) -> Option<u64> {
        self.data
            .iter()
            .find(|m| m.name.as_deref() == Some(name))
            .and_then(|m| m.values.first())
            .and_then(|v| v.value)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct InsightMetric {
    pub name: Option<String>,
    #[serde(default)]
    pub values: Vec<InsightValue>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InsightValue {
    pub value: Option<u64>,
}

/// `GET /{ig-user-id}/media`: only the ids are requested.
#[derive(Debug, Deserialize)]
pub(crate) struct MediaIdList {
    #[serde(default)]
    pub data: Vec<NodeRef>,
}

/// Graph error envelope: `{ "error": { "message": ..., "code": ... } }`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    pub message: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub code: Option<i64>,
}
