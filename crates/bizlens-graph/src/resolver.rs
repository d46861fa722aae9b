//! OAuth code → Instagram business identity.
//!
//! The Graph API exposes "my business account" only through the list of
//! Facebook pages the user manages, so resolution is a fixed three-hop chain:
//!
//! 1. exchange the authorization code for a bearer token;
//! 2. list managed pages;
//! 3. read the first page's `instagram_business_account` linkage.
//!
//! Each hop short-circuits with `?`; no hop is issued after a failure.

use bizlens_core::AccessToken;

use crate::client::GraphClient;
use crate::error::GraphError;

/// Business account id plus the token it was resolved with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub business_account_id: String,
    pub access_token: AccessToken,
}

pub struct AccountResolver<'a> {
    client: &'a GraphClient,
}

impl<'a> AccountResolver<'a> {
    #[must_use]
    pub fn new(client: &'a GraphClient) -> Self {
        Self { client }
    }

    /// Resolves an authorization code into a [`ResolvedIdentity`].
    ///
    /// # Errors
    ///
    /// - [`GraphError::AuthExchangeFailed`] if the code cannot be exchanged.
    /// - [`GraphError::NoManagedAccounts`] if the user manages no pages.
    /// - [`GraphError::NoLinkedBusinessAccount`] if the first page has no
    ///   linked Instagram business account.
    /// - [`GraphError::Upstream`] / [`GraphError::Timeout`] from any hop.
    pub async fn resolve(&self, code: &str) -> Result<ResolvedIdentity, GraphError> {
        let access_token = self.client.exchange_token(code).await?;

        let pages = self.client.list_managed_accounts(&access_token).await?;
        let page = pages.into_iter().next().ok_or(GraphError::NoManagedAccounts)?;

        let business_account_id = self
            .client
            .get_linked_business_account(&page.id, &access_token)
            .await
            .map_err(|err| match err {
                GraphError::NoLinkedBusinessAccount { page_id, .. } => {
                    GraphError::NoLinkedBusinessAccount {
                        page_id,
                        page_name: page.name.clone(),
                    }
                }
                other => other,
            })?;

        tracing::info!(
            page_id = %page.id,
            business_account_id = %business_account_id,
            "resolved Instagram business identity"
        );

        Ok(ResolvedIdentity {
            business_account_id,
            access_token,
        })
    }
}
