use bizlens_core::StoreError;
use bizlens_graph::GraphError;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("rate limit exceeded: maximum {quota} searches per hour")]
    RateLimitExceeded { quota: u32 },

    #[error("search result serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
}
