use thiserror::Error;

/// Errors returned by the Graph API client and the account resolver.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The OAuth token endpoint failed or returned no `access_token`.
    #[error("authorization code exchange failed: {0}")]
    AuthExchangeFailed(String),

    /// The token owner manages no Facebook pages.
    #[error("no Facebook pages are managed by this account")]
    NoManagedAccounts,

    /// The first managed page has no linked Instagram business account.
    #[error("Facebook page {page_id} ({}) is not connected to an Instagram business account", page_name.as_deref().unwrap_or("unnamed"))]
    NoLinkedBusinessAccount {
        page_id: String,
        page_name: Option<String>,
    },

    /// The response has no `business_discovery` node: the target is not a
    /// business/creator account or the username is wrong.
    #[error("business discovery data not found for '{username}'; the account may not be a business or creator account")]
    TargetNotDiscoverable { username: String },

    /// Non-2xx status, malformed body or transport failure.
    #[error("Graph API error at {endpoint}{}: {message}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Upstream {
        endpoint: &'static str,
        status: Option<u16>,
        message: String,
    },

    /// The call exceeded the configured per-request timeout.
    #[error("Graph API call to {endpoint} timed out")]
    Timeout { endpoint: &'static str },

    #[error("invalid Instagram username '{0}'")]
    InvalidUsername(String),

    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl GraphError {
    /// Maps a `reqwest` failure for `endpoint`, stripping the request URL so
    /// query-string credentials never reach logs.
    pub(crate) fn from_transport(endpoint: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return GraphError::Timeout { endpoint };
        }
        GraphError::Upstream {
            endpoint,
            status: err.status().map(|s| s.as_u16()),
            message: err.without_url().to_string(),
        }
    }
}
