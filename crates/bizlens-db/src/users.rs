//! Database operations for the `users` table.

use bizlens_core::{AccessToken, ProfileSnapshot, UserAccount};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{count_from_db, count_to_db, DbError};

const USER_COLUMNS: &str = "id, instagram_id, username, full_name, biography, \
     profile_picture_url, followers_count, follows_count, media_count, access_token, \
     created_at, updated_at";

/// A row from the `users` table.
#[derive(Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub instagram_id: String,
    pub username: String,
    pub full_name: Option<String>,
    pub biography: Option<String>,
    pub profile_picture_url: Option<String>,
    pub followers_count: Option<i64>,
    pub follows_count: Option<i64>,
    pub media_count: Option<i64>,
    pub access_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for UserRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRow")
            .field("id", &self.id)
            .field("instagram_id", &self.instagram_id)
            .field("username", &self.username)
            .field("followers_count", &self.followers_count)
            .field("access_token", &"[redacted]")
            .finish_non_exhaustive()
    }
}

impl From<UserRow> for UserAccount {
    fn from(row: UserRow) -> Self {
        UserAccount {
            id: row.id,
            instagram_id: row.instagram_id,
            username: row.username,
            full_name: row.full_name,
            biography: row.biography,
            profile_picture_url: row.profile_picture_url,
            followers_count: count_from_db(row.followers_count),
            follows_count: count_from_db(row.follows_count),
            media_count: count_from_db(row.media_count),
            access_token: AccessToken::new(row.access_token),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Creates or refreshes the user identified by the profile's Instagram id.
///
/// Conflicts on `instagram_id` update the profile columns, the access token
/// and `updated_at` in place. A profile without a username falls back to its
/// id so the `NOT NULL` column is always populated.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_user(
    pool: &PgPool,
    profile: &ProfileSnapshot,
    access_token: &AccessToken,
) -> Result<UserAccount, DbError> {
    let username = profile
        .username
        .clone()
        .unwrap_or_else(|| profile.id.clone());

    let row = sqlx::query_as::<_, UserRow>(&format!(
        "INSERT INTO users \
             (instagram_id, username, full_name, biography, profile_picture_url, \
              followers_count, follows_count, media_count, access_token) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         ON CONFLICT (instagram_id) DO UPDATE SET \
             username            = EXCLUDED.username, \
             full_name           = EXCLUDED.full_name, \
             biography           = EXCLUDED.biography, \
             profile_picture_url = EXCLUDED.profile_picture_url, \
             followers_count     = EXCLUDED.followers_count, \
             follows_count       = EXCLUDED.follows_count, \
             media_count         = EXCLUDED.media_count, \
             access_token        = EXCLUDED.access_token, \
             updated_at          = NOW() \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(&profile.id)
    .bind(&username)
    .bind(&profile.display_name)
    .bind(&profile.biography)
    .bind(&profile.profile_picture_url)
    .bind(count_to_db(profile.followers_count))
    .bind(count_to_db(profile.follows_count))
    .bind(count_to_db(profile.media_count))
    .bind(access_token.expose())
    .fetch_one(pool)
    .await?;

    Ok(row.into())
}

/// Fetches a user by internal id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] if
/// the query fails.
pub async fn get_user_by_id(pool: &PgPool, id: i64) -> Result<UserAccount, DbError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row.into())
}

/// Returns the user linked to an Instagram business account id, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_user_by_instagram_id(
    pool: &PgPool,
    instagram_id: &str,
) -> Result<Option<UserAccount>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE instagram_id = $1"
    ))
    .bind(instagram_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(UserAccount::from))
}

/// Returns the most recently updated user with the given username, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_user_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<UserAccount>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = $1 \
         ORDER BY updated_at DESC LIMIT 1"
    ))
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(UserAccount::from))
}

/// Total number of registered users.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_users(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
