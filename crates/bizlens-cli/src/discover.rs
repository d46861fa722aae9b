//! `discover` and `analyze` handlers.

use anyhow::Context;
use chrono::{Days, NaiveDate, Utc};

/// Default analysis window when `--start` is omitted.
const DEFAULT_ANALYSIS_DAYS: u64 = 30;

pub(crate) async fn run_discover(
    pool: &sqlx::PgPool,
    config: &bizlens_core::AppConfig,
    user_id: i64,
    target: &str,
    include_media: bool,
) -> anyhow::Result<()> {
    let user = crate::load_user(pool, user_id).await?;
    let service = crate::build_service(pool, config)?;
    let result = service
        .discover(&user, target, include_media)
        .await
        .with_context(|| format!("business discovery for '{target}' failed"))?;
    crate::print_json(&result)
}

pub(crate) async fn run_analyze(
    pool: &sqlx::PgPool,
    config: &bizlens_core::AppConfig,
    user_id: i64,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> anyhow::Result<()> {
    let (start, end) = resolve_range(start, end, Utc::now().date_naive())?;
    let user = crate::load_user(pool, user_id).await?;
    let service = crate::build_service(pool, config)?;
    let analysis = service
        .analyze(&user, start, end)
        .await
        .context("account analysis failed")?;
    crate::print_json(&analysis)
}

/// Fills in omitted bounds: `end` defaults to `today` and `start` to
/// thirty days before `end`.
pub(crate) fn resolve_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> anyhow::Result<(NaiveDate, NaiveDate)> {
    let end = end.unwrap_or(today);
    let start = match start {
        Some(start) => start,
        None => end
            .checked_sub_days(Days::new(DEFAULT_ANALYSIS_DAYS))
            .context("end date is too early to derive a default start")?,
    };
    Ok((start, end))
}
