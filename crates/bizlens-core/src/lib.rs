pub mod app_config;
pub mod config;
pub mod store;
pub mod token;
pub mod types;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use store::{SearchStore, StoreError};
pub use token::AccessToken;
pub use types::{
    AccountAnalysis, AccountInsights, DiscoveryResult, NewSearchRecord, PostEngagement,
    PostRecord, ProfileSnapshot, SearchRecord, SearchStatistics, SearchStatus, UserAccount,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
