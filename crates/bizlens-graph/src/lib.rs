//! Typed client for the Instagram Graph API and the OAuth account
//! resolution chain built on top of it.

pub mod client;
pub mod error;
pub mod resolver;
pub mod types;

pub use client::{normalize_username, GraphClient, GraphConfig};
pub use error::GraphError;
pub use resolver::{AccountResolver, ResolvedIdentity};
pub use types::ManagedPage;
