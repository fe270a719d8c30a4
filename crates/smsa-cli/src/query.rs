//! Read-only query handlers and retention cleanup.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use smsa_core::{Platform, SentimentLabel};

fn platform_label(platform: Option<Platform>) -> &'static str {
    platform.map_or("all platforms", |p| p.as_str())
}

/// Truncate `text` to `max` characters for single-line display.
fn snippet(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let cut: String = flat.chars().take(max.saturating_sub(3)).collect();
    format!("{cut}...")
}

/// Show label counts and percentages over the last `hours`.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_summary(
    pool: &sqlx::PgPool,
    platform: Option<Platform>,
    hours: i64,
) -> anyhow::Result<()> {
    let since = Utc::now() - Duration::hours(hours);
    let summary = smsa_db::sentiment_summary(pool, platform, since).await?;

    if summary.total() == 0 {
        println!(
            "no sentiment results in the last {hours}h for {}; run `smsa once` first",
            platform_label(platform)
        );
        return Ok(());
    }

    println!(
        "sentiment over the last {hours}h ({})",
        platform_label(platform)
    );
    println!("{:<12}{:<10}PERCENT", "LABEL", "COUNT");
    for label in SentimentLabel::ALL {
        println!(
            "{:<12}{:<10}{:.2}",
            label.as_str(),
            summary.count(label),
            summary.percentage(label)
        );
    }
    println!("{:<12}{}", "TOTAL", summary.total());
    Ok(())
}

/// Show per-hour label counts over the last `hours`, one line per hour.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_trend(
    pool: &sqlx::PgPool,
    platform: Option<Platform>,
    hours: i64,
) -> anyhow::Result<()> {
    let since = Utc::now() - Duration::hours(hours);
    let buckets = smsa_db::sentiment_trend(pool, platform, since).await?;

    if buckets.is_empty() {
        println!(
            "no sentiment results in the last {hours}h for {}",
            platform_label(platform)
        );
        return Ok(());
    }

    println!("{:<18}{:<10}{:<10}NEGATIVE", "HOUR", "POSITIVE", "NEUTRAL");
    for (hour, counts) in pivot_by_hour(&buckets) {
        println!(
            "{:<18}{:<10}{:<10}{}",
            hour.format("%Y-%m-%d %H:00"),
            counts[0],
            counts[1],
            counts[2]
        );
    }
    Ok(())
}

/// Fold label buckets into `[positive, neutral, negative]` counts per hour.
fn pivot_by_hour(buckets: &[smsa_db::TrendBucket]) -> BTreeMap<DateTime<Utc>, [i64; 3]> {
    let mut hours: BTreeMap<DateTime<Utc>, [i64; 3]> = BTreeMap::new();
    for bucket in buckets {
        let slot = match bucket.label.parse::<SentimentLabel>() {
            Ok(SentimentLabel::Positive) => 0,
            Ok(SentimentLabel::Neutral) => 1,
            Ok(SentimentLabel::Negative) => 2,
            Err(_) => continue,
        };
        hours.entry(bucket.hour).or_default()[slot] += bucket.count;
    }
    hours
}

/// List raw posts collected over the last `hours`.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_recent(
    pool: &sqlx::PgPool,
    platform: Option<Platform>,
    hours: i64,
    limit: i64,
) -> anyhow::Result<()> {
    let since = Utc::now() - Duration::hours(hours);
    let posts = smsa_db::list_recent_posts(pool, platform, since, limit).await?;

    if posts.is_empty() {
        println!(
            "no posts in the last {hours}h for {}",
            platform_label(platform)
        );
        return Ok(());
    }

    println!("{:<10}{:<18}{:<20}TEXT", "PLATFORM", "CREATED", "AUTHOR");
    for post in &posts {
        println!(
            "{:<10}{:<18}{:<20}{}",
            post.platform,
            post.created_at.format("%Y-%m-%d %H:%M"),
            snippet(&post.author_ref, 18),
            snippet(&post.text, 70)
        );
    }
    Ok(())
}

/// List the most confident results for `label`.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_top(
    pool: &sqlx::PgPool,
    label: SentimentLabel,
    platform: Option<Platform>,
    limit: i64,
) -> anyhow::Result<()> {
    let rows = smsa_db::top_sentiment_results(pool, label, platform, limit).await?;

    if rows.is_empty() {
        println!("no {label} results for {}", platform_label(platform));
        return Ok(());
    }

    println!("{:<10}{:<12}{:<11}TEXT", "PLATFORM", "CONFIDENCE", "SOURCE");
    for row in &rows {
        println!(
            "{:<10}{:<12.3}{:<11}{}",
            row.platform,
            row.confidence,
            row.score_source,
            snippet(&row.text, 70)
        );
    }
    Ok(())
}

/// Delete posts and results older than `days`.
///
/// # Errors
///
/// Returns an error if `days` is zero or the delete fails.
pub(crate) async fn run_cleanup(pool: &sqlx::PgPool, days: u32) -> anyhow::Result<()> {
    anyhow::ensure!(days > 0, "retention must be at least one day");
    let cutoff = Utc::now() - Duration::days(i64::from(days));
    let report = smsa_db::delete_older_than(pool, cutoff).await?;

    tracing::info!(
        days,
        posts_deleted = report.posts_deleted,
        results_deleted = report.results_deleted,
        "retention cleanup finished"
    );
    println!(
        "deleted {} posts and {} results older than {days} day(s)",
        report.posts_deleted, report.results_deleted
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_flattens_and_truncates() {
        assert_eq!(snippet("a\nb   c", 20), "a b c");
        assert_eq!(snippet("abcdefghij", 8), "abcde...");
        assert_eq!(snippet("abcdefgh", 8), "abcdefgh");
    }

    #[test]
    fn trend_buckets_pivot_into_one_row_per_hour() {
        use chrono::TimeZone;

        let nine = Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap();
        let ten = Utc.with_ymd_and_hms(2025, 5, 1, 10, 0, 0).unwrap();
        let bucket = |hour, label: &str, count| smsa_db::TrendBucket {
            hour,
            label: label.to_string(),
            count,
        };
        let rows = pivot_by_hour(&[
            bucket(ten, "negative", 1),
            bucket(nine, "positive", 4),
            bucket(nine, "negative", 2),
            bucket(nine, "bogus", 9),
        ]);

        let rows: Vec<_> = rows.into_iter().collect();
        assert_eq!(rows, vec![(nine, [4, 0, 2]), (ten, [0, 0, 1])]);
    }

    #[test]
    fn missing_platform_reads_as_all() {
        assert_eq!(platform_label(None), "all platforms");
        assert_eq!(platform_label(Some(Platform::Reddit)), "reddit");
    }
}
