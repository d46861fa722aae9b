//! Facebook login: print the OAuth dialog URL, then exchange the returned
//! code and register (or refresh) the user.

use anyhow::Context;
use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum AuthCommands {
    /// Print the Facebook OAuth dialog URL
    Url,
    /// Exchange an authorization code and register the user
    Login {
        /// Authorization code from the OAuth redirect
        #[arg(long)]
        code: String,
    },
    /// Show the registered user for an Instagram username
    Show {
        #[arg(long)]
        username: String,
    },
}

pub(crate) fn run_auth_url(config: &bizlens_core::AppConfig) -> anyhow::Result<()> {
    let graph_config = bizlens_graph::GraphConfig::from_app_config(config);
    let client = bizlens_graph::GraphClient::new(&graph_config)
        .context("failed to build Graph API client")?;
    println!("{}", client.authorization_url());
    Ok(())
}

/// Resolves `code` to an Instagram business account and upserts the user.
///
/// # Errors
///
/// Returns an error if any step of the login chain fails or the user row
/// cannot be written.
pub(crate) async fn run_auth_login(
    pool: &sqlx::PgPool,
    config: &bizlens_core::AppConfig,
    code: &str,
) -> anyhow::Result<()> {
    let service = crate::build_service(pool, config)?;
    let account = service
        .authenticate(code)
        .await
        .context("Facebook login failed")?;

    let existing =
        bizlens_db::get_user_by_instagram_id(pool, &account.identity.business_account_id).await?;
    let user = bizlens_db::upsert_user(pool, &account.profile, &account.identity.access_token)
        .await
        .context("failed to save user")?;

    let verb = if existing.is_some() { "updated" } else { "registered" };
    tracing::info!(user_id = user.id, instagram_id = %user.instagram_id, "user {verb}");
    println!(
        "{verb} user {} (@{}, instagram id {})",
        user.id, user.username, user.instagram_id
    );
    Ok(())
}

/// Prints the registered user behind `username`, so its id can be passed to
/// `--user-id`.
///
/// # Errors
///
/// Returns an error if the lookup fails or no user has that username.
pub(crate) async fn run_auth_show(pool: &sqlx::PgPool, username: &str) -> anyhow::Result<()> {
    let username = bizlens_graph::normalize_username(username);
    let user = bizlens_db::get_user_by_username(pool, &username)
        .await?
        .ok_or_else(|| anyhow::anyhow!("no registered user '@{username}'; run `auth login` first"))?;

    println!("id:           {}", user.id);
    println!("username:     @{}", user.username);
    println!("instagram id: {}", user.instagram_id);
    println!(
        "followers:    {}",
        user.followers_count
            .map_or_else(|| "unknown".to_string(), |f| f.to_string())
    );
    println!("updated:      {}", user.updated_at.format("%Y-%m-%d %H:%M:%S"));
    Ok(())
}
