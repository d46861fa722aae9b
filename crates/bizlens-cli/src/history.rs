//! Read-only views over a user's search history.

use bizlens_core::SearchRecord;

pub(crate) async fn run_history(
    pool: &sqlx::PgPool,
    config: &bizlens_core::AppConfig,
    user_id: i64,
    recent: bool,
) -> anyhow::Result<()> {
    let service = crate::build_service(pool, config)?;
    let records = if recent {
        service.recent_searches(user_id).await?
    } else {
        service.history(user_id).await?
    };

    if records.is_empty() {
        println!(
            "no searches found for user {user_id}{}",
            if recent { " in the last 24 hours" } else { "" }
        );
        return Ok(());
    }

    println!(
        "{:<8}{:<22}{:<10}{:<32}DETAIL",
        "ID", "CREATED", "STATUS", "TARGET"
    );
    for record in &records {
        println!(
            "{:<8}{:<22}{:<10}{:<32}{}",
            record.id,
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
            record.status,
            record.target_username,
            detail(record)
        );
    }
    Ok(())
}

pub(crate) async fn run_stats(
    pool: &sqlx::PgPool,
    config: &bizlens_core::AppConfig,
    user_id: i64,
) -> anyhow::Result<()> {
    let service = crate::build_service(pool, config)?;
    let stats = service.statistics(user_id).await?;
    crate::print_json(&stats)
}

/// Target id for successes, truncated error message for failures.
fn detail(record: &SearchRecord) -> String {
    if let Some(message) = record.error_message.as_deref() {
        if message.chars().count() > 60 {
            return format!("{}...", message.chars().take(60).collect::<String>());
        }
        return message.to_string();
    }
    record.target_instagram_id.clone().unwrap_or_default()
}
