//! Age-based pruning of stored posts and results.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionReport {
    pub posts_deleted: u64,
    pub results_deleted: u64,
}

/// Delete posts collected and results processed before `cutoff`.
///
/// Both deletes run in one transaction so a failure leaves neither table
/// pruned.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either delete fails.
pub async fn delete_older_than(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<RetentionReport, DbError> {
    let mut tx = pool.begin().await?;

    let results = sqlx::query("DELETE FROM sentiment_results WHERE processed_at < $1")
        .bind(cutoff)
        .execute(&mut *tx)
        .await?;

    let posts = sqlx::query("DELETE FROM raw_posts WHERE collected_at < $1")
        .bind(cutoff)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(RetentionReport {
        posts_deleted: posts.rows_affected(),
        results_deleted: results.rows_affected(),
    })
}
