mod auth;
mod discover;
mod history;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::auth::AuthCommands;

#[derive(Debug, Parser)]
#[command(name = "bizlens-cli")]
#[command(about = "Instagram business discovery and engagement analysis")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Facebook login and user registration
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Look up a public business or creator account
    Discover {
        /// Id of the registered user performing the search
        #[arg(long)]
        user_id: i64,
        /// Instagram username to look up (a leading @ is ignored)
        #[arg(long)]
        target: String,
        /// Also fetch recent posts and compute engagement
        #[arg(long)]
        include_media: bool,
    },
    /// Analyze engagement on the user's own account
    Analyze {
        #[arg(long)]
        user_id: i64,
        /// First day of the range, inclusive (YYYY-MM-DD); defaults to 30 days before --end
        #[arg(long)]
        start: Option<chrono::NaiveDate>,
        /// Last day of the range, inclusive (YYYY-MM-DD); defaults to today (UTC)
        #[arg(long)]
        end: Option<chrono::NaiveDate>,
    },
    /// Show search history, newest first
    History {
        #[arg(long)]
        user_id: i64,
        /// Only show searches from the last 24 hours
        #[arg(long)]
        recent: bool,
    },
    /// Show search statistics and remaining hourly quota
    Stats {
        #[arg(long)]
        user_id: i64,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Verify database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("bizlens-cli ready; run with --help for commands");
        return Ok(());
    };

    let config = bizlens_core::load_app_config().context("failed to load configuration")?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::debug!(env = %config.env, "configuration loaded");

    if let Commands::Auth {
        command: AuthCommands::Url,
    } = command
    {
        return auth::run_auth_url(&config);
    }

    let pool_config = bizlens_db::PoolConfig::from_app_config(&config);
    let pool = bizlens_db::connect_pool(&config.database_url, pool_config)
        .await
        .context("failed to connect to database")?;

    match command {
        Commands::Db { command } => match command {
            DbCommands::Ping => run_db_ping(&pool).await,
            DbCommands::Migrate => run_db_migrate(&pool).await,
        },
        Commands::Auth { command } => match command {
            AuthCommands::Url => auth::run_auth_url(&config),
            AuthCommands::Login { code } => auth::run_auth_login(&pool, &config, &code).await,
            AuthCommands::Show { username } => auth::run_auth_show(&pool, &username).await,
        },
        Commands::Discover {
            user_id,
            target,
            include_media,
        } => discover::run_discover(&pool, &config, user_id, &target, include_media).await,
        Commands::Analyze {
            user_id,
            start,
            end,
        } => discover::run_analyze(&pool, &config, user_id, start, end).await,
        Commands::History { user_id, recent } => {
            history::run_history(&pool, &config, user_id, recent).await
        }
        Commands::Stats { user_id } => history::run_stats(&pool, &config, user_id).await,
    }
}

async fn run_db_ping(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    bizlens_db::ping(pool).await.context("database ping failed")?;
    let users = bizlens_db::count_users(pool).await?;
    println!("database reachable ({users} registered users)");
    Ok(())
}

async fn run_db_migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let applied = bizlens_db::run_migrations(pool).await?;
    println!("applied {applied} migration(s)");
    Ok(())
}

/// Builds the discovery service over the Postgres search history.
pub(crate) fn build_service(
    pool: &sqlx::PgPool,
    config: &bizlens_core::AppConfig,
) -> anyhow::Result<bizlens_discovery::DiscoveryService> {
    let graph_config = bizlens_graph::GraphConfig::from_app_config(config);
    let client = bizlens_graph::GraphClient::new(&graph_config)
        .context("failed to build Graph API client")?;
    let store = Arc::new(bizlens_db::PgSearchStore::new(pool.clone()));
    Ok(bizlens_discovery::DiscoveryService::new(
        client,
        store,
        bizlens_discovery::DiscoverySettings::from_app_config(config),
    ))
}

/// Loads a registered user or fails with a hint to log in first.
pub(crate) async fn load_user(
    pool: &sqlx::PgPool,
    user_id: i64,
) -> anyhow::Result<bizlens_core::UserAccount> {
    match bizlens_db::get_user_by_id(pool, user_id).await {
        Ok(user) => Ok(user),
        Err(bizlens_db::DbError::NotFound) => {
            anyhow::bail!("user {user_id} not found; run `auth login` first")
        }
        Err(e) => Err(e.into()),
    }
}

/// Prints `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
