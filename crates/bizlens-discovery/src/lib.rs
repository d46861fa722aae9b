//! Business discovery pipeline: quota enforcement, cached lookups, engagement
//! analysis and search history on top of `bizlens-graph` and a
//! [`bizlens_core::SearchStore`].

pub mod aggregate;
pub mod cache;
pub mod error;
pub mod memory;
pub mod rate_limit;
pub mod service;

pub use aggregate::{account_insights, engagement_rate, score_posts, EngagementAggregator};
pub use cache::DiscoveryCache;
pub use error::DiscoveryError;
pub use memory::InMemorySearchStore;
pub use rate_limit::RateLimiter;
pub use service::{AuthenticatedAccount, DiscoveryService, DiscoverySettings};
