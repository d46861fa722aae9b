//! HTTP client for the Instagram Graph API.
//!
//! Wraps `reqwest` with Graph-specific URL building, bearer authentication
//! and typed response decoding. Every failure is mapped into [`GraphError`];
//! raw transport errors never escape this module.

use std::time::Duration;

use bizlens_core::{AccessToken, AppConfig, DiscoveryResult, PostEngagement, ProfileSnapshot};
use chrono::{NaiveDate, NaiveTime};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;

use crate::error::GraphError;
use crate::types::{
    AccountsResponse, DiscoveryEnvelope, ErrorEnvelope, GraphAccount, GraphMedia, ManagedPage,
    MediaIdList, PageLinkResponse, TokenResponse,
};

const PROFILE_FIELDS: &str =
    "id,username,name,biography,followers_count,follows_count,media_count,profile_picture_url";
const DISCOVERY_FIELDS: &str = "id,username,name,biography,followers_count,follows_count,media_count,profile_picture_url,website";
const DISCOVERY_MEDIA_FIELDS: &str = "id,media_url,media_type,caption,like_count,comments_count,timestamp,permalink,insights.metric(saved).period(lifetime)";
const POST_DETAIL_FIELDS: &str = "id,like_count,comments_count,insights.metric(saved).period(lifetime)";

/// Upstream page size cap for the media edge.
const MEDIA_PAGE_LIMIT: &str = "100";

/// Longest Instagram username accepted by the platform.
const MAX_USERNAME_LEN: usize = 30;

/// Longest raw body excerpt kept in an error message.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Endpoints and OAuth client settings for [`GraphClient`].
#[derive(Clone)]
pub struct GraphConfig {
    pub graph_base_url: String,
    pub authorization_url: String,
    pub token_url: String,
    pub accounts_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scope: String,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl GraphConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            graph_base_url: config.graph_base_url.clone(),
            authorization_url: config.facebook_authorization_url.clone(),
            token_url: config.facebook_token_url.clone(),
            accounts_url: config.facebook_accounts_url.clone(),
            client_id: config.facebook_client_id.clone(),
            client_secret: config.facebook_client_secret.clone(),
            redirect_uri: config.facebook_redirect_uri.clone(),
            scope: config.facebook_scope.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            user_agent: config.user_agent.clone(),
        }
    }

    /// Points every endpoint at `base_url` (for testing with wiremock).
    ///
    /// The token and accounts endpoints become `{base}/oauth/access_token`
    /// and `{base}/me/accounts`, mirroring the real Graph layout.
    #[must_use]
    pub fn for_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            graph_base_url: base.to_string(),
            authorization_url: format!("{base}/dialog/oauth"),
            token_url: format!("{base}/oauth/access_token"),
            accounts_url: format!("{base}/me/accounts"),
            client_id: "test-client".to_string(),
            client_secret: "test-secret".to_string(),
            redirect_uri: "http://localhost/callback".to_string(),
            scope: "instagram_basic".to_string(),
            request_timeout: Duration::from_secs(30),
            user_agent: "bizlens-test".to_string(),
        }
    }
}

impl std::fmt::Debug for GraphConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphConfig")
            .field("graph_base_url", &self.graph_base_url)
            .field("authorization_url", &self.authorization_url)
            .field("token_url", &self.token_url)
            .field("accounts_url", &self.accounts_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("redirect_uri", &self.redirect_uri)
            .field("scope", &self.scope)
            .field("request_timeout", &self.request_timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Client for the Instagram Graph API.
///
/// Stateless apart from connection pooling: the caller passes the access
/// token into every call.
pub struct GraphClient {
    client: Client,
    base_url: Url,
    authorization_url: Url,
    token_url: Url,
    accounts_url: Url,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    scope: String,
}

impl GraphClient {
    /// Builds a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidConfig`] if an endpoint URL does not
    /// parse or the underlying `reqwest::Client` cannot be constructed.
    pub fn new(config: &GraphConfig) -> Result<Self, GraphError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| GraphError::InvalidConfig(format!("http client: {e}")))?;

        // Normalise: exactly one trailing slash so node ids append as path
        // segments instead of replacing the version segment.
        let base_url = parse_url(&format!(
            "{}/",
            config.graph_base_url.trim_end_matches('/')
        ))?;
        if base_url.cannot_be_a_base() {
            return Err(GraphError::InvalidConfig(format!(
                "graph base URL '{}' cannot carry a path",
                config.graph_base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            authorization_url: parse_url(&config.authorization_url)?,
            token_url: parse_url(&config.token_url)?,
            accounts_url: parse_url(&config.accounts_url)?,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scope: config.scope.clone(),
        })
    }

    /// The OAuth dialog URL the user must visit to obtain an authorization code.
    #[must_use]
    pub fn authorization_url(&self) -> Url {
        let mut url = self.authorization_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", &self.scope)
            .append_pair("response_type", "code");
        url
    }

    /// Exchanges an OAuth authorization code for a bearer token.
    ///
    /// # Errors
    ///
    /// - [`GraphError::Timeout`] if the token endpoint does not answer in time.
    /// - [`GraphError::AuthExchangeFailed`] on any other failure, including a
    ///   2xx response without an `access_token` field.
    pub async fn exchange_token(&self, code: &str) -> Result<AccessToken, GraphError> {
        const ENDPOINT: &str = "oauth/access_token";
        tracing::debug!("exchanging authorization code for access token");

        let mut url = self.token_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("client_secret", &self.client_secret)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("code", code);

        let response: TokenResponse = match self.send_json(ENDPOINT, self.client.get(url)).await {
            Ok(body) => body,
            Err(err @ GraphError::Timeout { .. }) => return Err(err),
            Err(err) => return Err(GraphError::AuthExchangeFailed(err.to_string())),
        };

        response
            .access_token
            .filter(|t| !t.is_empty())
            .map(AccessToken::new)
            .ok_or_else(|| {
                GraphError::AuthExchangeFailed("response did not contain an access_token".into())
            })
    }

    /// Lists the Facebook pages managed by the token owner, in upstream order.
    ///
    /// An absent `data` array yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Upstream`] or [`GraphError::Timeout`].
    pub async fn list_managed_accounts(
        &self,
        token: &AccessToken,
    ) -> Result<Vec<ManagedPage>, GraphError> {
        const ENDPOINT: &str = "me/accounts";
        let request = self.authed(self.accounts_url.clone(), token);
        let response: AccountsResponse = self.send_json(ENDPOINT, request).await?;
        let pages = response.data.unwrap_or_default();
        tracing::debug!(count = pages.len(), "listed managed pages");
        Ok(pages)
    }

    /// Fetches the Instagram business account id linked to a Facebook page.
    ///
    /// # Errors
    ///
    /// - [`GraphError::NoLinkedBusinessAccount`] if the page has no linkage.
    /// - [`GraphError::Upstream`] or [`GraphError::Timeout`] on call failure.
    pub async fn get_linked_business_account(
        &self,
        page_id: &str,
        token: &AccessToken,
    ) -> Result<String, GraphError> {
        const ENDPOINT: &str = "page";
        let url = self.node_url(&[page_id], &[("fields", "instagram_business_account")])?;
        let response: PageLinkResponse = self.send_json(ENDPOINT, self.authed(url, token)).await?;

        let account_id = response
            .instagram_business_account
            .map(|node| node.id)
            .ok_or_else(|| GraphError::NoLinkedBusinessAccount {
                page_id: page_id.to_string(),
                page_name: None,
            })?;
        tracing::debug!(page_id, account_id = %account_id, "resolved linked business account");
        Ok(account_id)
    }

    /// Fetches an Instagram account's own profile.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Upstream`] or [`GraphError::Timeout`].
    pub async fn get_profile(
        &self,
        account_id: &str,
        token: &AccessToken,
    ) -> Result<ProfileSnapshot, GraphError> {
        const ENDPOINT: &str = "profile";
        let url = self.node_url(&[account_id], &[("fields", PROFILE_FIELDS)])?;
        let account: GraphAccount = self.send_json(ENDPOINT, self.authed(url, token)).await?;
        let (profile, _) = account.into_parts();
        tracing::debug!(
            account_id,
            username = profile.username.as_deref().unwrap_or(""),
            "fetched profile"
        );
        Ok(profile)
    }

    /// Runs a business discovery lookup for `target_username` on behalf of
    /// `own_account_id`.
    ///
    /// Posts are returned raw: no engagement rate and no insights. With
    /// `include_media`, each post's lifetime `saved` insight fills
    /// `saved_count` when upstream reports it.
    ///
    /// # Errors
    ///
    /// - [`GraphError::InvalidUsername`] if the username is not a valid handle.
    /// - [`GraphError::TargetNotDiscoverable`] if `business_discovery` is absent.
    /// - [`GraphError::Upstream`] or [`GraphError::Timeout`] on call failure.
    pub async fn discover_account(
        &self,
        own_account_id: &str,
        target_username: &str,
        token: &AccessToken,
        include_media: bool,
    ) -> Result<DiscoveryResult, GraphError> {
        const ENDPOINT: &str = "business_discovery";
        validate_username(target_username)?;

        let fields = if include_media {
            format!(
                "business_discovery.username({target_username}){{{DISCOVERY_FIELDS},media{{{DISCOVERY_MEDIA_FIELDS}}}}}"
            )
        } else {
            format!("business_discovery.username({target_username}){{{DISCOVERY_FIELDS}}}")
        };
        let url = self.node_url(&[own_account_id], &[("fields", &fields)])?;
        let envelope: DiscoveryEnvelope = self.send_json(ENDPOINT, self.authed(url, token)).await?;

        let account =
            envelope
                .business_discovery
                .ok_or_else(|| GraphError::TargetNotDiscoverable {
                    username: target_username.to_string(),
                })?;
        let (profile, posts) = account.into_parts();
        tracing::debug!(
            target_username,
            include_media,
            posts = posts.len(),
            "business discovery returned"
        );

        Ok(DiscoveryResult {
            profile,
            posts,
            insights: None,
        })
    }

    /// Fetches like, comment and saved counts for one post.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Upstream`] or [`GraphError::Timeout`].
    pub async fn get_post_detail(
        &self,
        post_id: &str,
        token: &AccessToken,
    ) -> Result<PostEngagement, GraphError> {
        const ENDPOINT: &str = "media_detail";
        let url = self.node_url(&[post_id], &[("fields", POST_DETAIL_FIELDS)])?;
        let media: GraphMedia = self.send_json(ENDPOINT, self.authed(url, token)).await?;
        Ok(media.into_engagement())
    }

    /// Lists ids of posts created in `[since, until)` (UTC days), newest first
    /// as upstream returns them, capped at one page of 100.
    ///
    /// `until` is exclusive: callers wanting an inclusive end day pass the
    /// following day.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Upstream`] or [`GraphError::Timeout`].
    pub async fn list_post_ids_in_range(
        &self,
        account_id: &str,
        token: &AccessToken,
        since: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<String>, GraphError> {
        const ENDPOINT: &str = "media";
        let since_ts = day_start_timestamp(since).to_string();
        let until_ts = day_start_timestamp(until).to_string();
        let url = self.node_url(
            &[account_id, "media"],
            &[
                ("fields", "id"),
                ("since", &since_ts),
                ("until", &until_ts),
                ("limit", MEDIA_PAGE_LIMIT),
            ],
        )?;
        let list: MediaIdList = self.send_json(ENDPOINT, self.authed(url, token)).await?;
        let ids: Vec<String> = list.data.into_iter().map(|node| node.id).collect();
        tracing::debug!(account_id, %since, %until, count = ids.len(), "listed post ids");
        Ok(ids)
    }

    /// Builds `{base}/{segments...}?{params...}` with percent-encoded parts.
    fn node_url(&self, segments: &[&str], params: &[(&str, &str)]) -> Result<Url, GraphError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                GraphError::InvalidConfig("graph base URL cannot carry a path".into())
            })?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    fn authed(&self, url: Url, token: &AccessToken) -> RequestBuilder {
        self.client.get(url).bearer_auth(token.expose())
    }

    /// Sends the request, asserts a 2xx status and decodes the body as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Timeout`] when the per-request timeout fires and
    /// [`GraphError::Upstream`] for transport failures, non-2xx statuses and
    /// bodies that do not decode as `T`.
    async fn send_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
    ) -> Result<T, GraphError> {
        let response = request
            .send()
            .await
            .map_err(|e| GraphError::from_transport(endpoint, e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GraphError::from_transport(endpoint, e))?;

        if !status.is_success() {
            tracing::debug!(endpoint, status = status.as_u16(), "Graph API returned error status");
            return Err(GraphError::Upstream {
                endpoint,
                status: Some(status.as_u16()),
                message: upstream_message(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| GraphError::Upstream {
            endpoint,
            status: Some(status.as_u16()),
            message: format!("malformed response body: {e}"),
        })
    }
}

/// Trims whitespace and a leading `@` from a user-entered handle.
#[must_use]
pub fn normalize_username(raw: &str) -> String {
    raw.trim().trim_start_matches('@').to_string()
}

/// Instagram handles are 1-30 characters of ASCII letters, digits, `.` and
/// `_`. The username is interpolated into a field expression, so anything
/// else is rejected before the request is built.
fn validate_username(username: &str) -> Result<(), GraphError> {
    let valid = !username.is_empty()
        && username.len() <= MAX_USERNAME_LEN
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(GraphError::InvalidUsername(username.to_string()))
    }
}

fn parse_url(raw: &str) -> Result<Url, GraphError> {
    Url::parse(raw).map_err(|e| GraphError::InvalidConfig(format!("invalid URL '{raw}': {e}")))
}

fn day_start_timestamp(day: NaiveDate) -> i64 {
    day.and_time(NaiveTime::MIN).and_utc().timestamp()
}

/// Prefers the Graph error envelope's message; falls back to a truncated body.
fn upstream_message(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        let detail = envelope.error;
        let message = detail.message.unwrap_or_else(|| "unknown error".to_string());
        return match (detail.kind, detail.code) {
            (Some(kind), Some(code)) => format!("{message} ({kind}, code {code})"),
            (Some(kind), None) => format!("{message} ({kind})"),
            (None, Some(code)) => format!("{message} (code {code})"),
            (None, None) => message,
        };
    }
    if body.trim().is_empty() {
        return "empty response body".to_string();
    }
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}
