#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub facebook_client_id: String,
    pub facebook_client_secret: String,
    pub facebook_redirect_uri: String,
    pub facebook_scope: String,
    pub facebook_authorization_url: String,
    pub facebook_token_url: String,
    pub facebook_accounts_url: String,
    pub graph_base_url: String,
    pub hourly_search_quota: u32,
    pub cache_ttl_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub analysis_concurrency: usize,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("facebook_client_id", &self.facebook_client_id)
            .field("facebook_client_secret", &"[redacted]")
            .field("facebook_redirect_uri", &self.facebook_redirect_uri)
            .field("facebook_scope", &self.facebook_scope)
            .field(
                "facebook_authorization_url",
                &self.facebook_authorization_url,
            )
            .field("facebook_token_url", &self.facebook_token_url)
            .field("facebook_accounts_url", &self.facebook_accounts_url)
            .field("graph_base_url", &self.graph_base_url)
            .field("hourly_search_quota", &self.hourly_search_quota)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("analysis_concurrency", &self.analysis_concurrency)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}
