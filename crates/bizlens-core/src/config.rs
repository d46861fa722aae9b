use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.facebook.com/v19.0";
const DEFAULT_AUTHORIZATION_URL: &str = "https://www.facebook.com/v19.0/dialog/oauth";
const DEFAULT_TOKEN_URL: &str = "https://graph.facebook.com/v19.0/oauth/access_token";
const DEFAULT_ACCOUNTS_URL: &str = "https://graph.facebook.com/v19.0/me/accounts";
const DEFAULT_SCOPE: &str =
    "instagram_basic,instagram_manage_insights,pages_show_list,pages_read_engagement,business_management";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let database_url = require("DATABASE_URL")?;
    let facebook_client_id = require("FACEBOOK_CLIENT_ID")?;
    let facebook_client_secret = require("FACEBOOK_CLIENT_SECRET")?;
    let facebook_redirect_uri = require("FACEBOOK_REDIRECT_URI")?;

    let env = parse_environment(&or_default("BIZLENS_ENV", "development"))?;
    let log_level = or_default("BIZLENS_LOG_LEVEL", "info");

    let facebook_scope = or_default("FACEBOOK_SCOPE", DEFAULT_SCOPE);
    let facebook_authorization_url =
        or_default("FACEBOOK_AUTHORIZATION_URL", DEFAULT_AUTHORIZATION_URL);
    let facebook_token_url = or_default("FACEBOOK_TOKEN_URL", DEFAULT_TOKEN_URL);
    let facebook_accounts_url = or_default("FACEBOOK_ACCOUNTS_URL", DEFAULT_ACCOUNTS_URL);
    let graph_base_url = or_default("INSTAGRAM_GRAPH_BASE_URL", DEFAULT_GRAPH_BASE_URL);

    let hourly_search_quota = parse_u32("BIZLENS_HOURLY_SEARCH_QUOTA", "200")?;
    let cache_ttl_secs = parse_u64("BIZLENS_CACHE_TTL_SECS", "3600")?;
    let request_timeout_secs = parse_u64("BIZLENS_REQUEST_TIMEOUT_SECS", "30")?;
    if request_timeout_secs == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "BIZLENS_REQUEST_TIMEOUT_SECS".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    let user_agent = or_default("BIZLENS_USER_AGENT", "bizlens/0.1 (business-discovery)");
    let analysis_concurrency = parse_usize("BIZLENS_ANALYSIS_CONCURRENCY", "1")?;

    let db_max_connections = parse_u32("BIZLENS_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("BIZLENS_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("BIZLENS_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        facebook_client_id,
        facebook_client_secret,
        facebook_redirect_uri,
        facebook_scope,
        facebook_authorization_url,
        facebook_token_url,
        facebook_accounts_url,
        graph_base_url,
        hourly_search_quota,
        cache_ttl_secs,
        request_timeout_secs,
        user_agent,
        analysis_concurrency,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "BIZLENS_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}
