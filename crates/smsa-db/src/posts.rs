//! Database operations for the `raw_posts` table.

use chrono::{DateTime, Utc};
use serde_json::Value;
use smsa_core::{Platform, Post};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `raw_posts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RawPostRow {
    pub id: i64,
    pub source_id: String,
    pub platform: String,
    pub text: String,
    pub author_ref: String,
    pub engagement: Value,
    pub keywords: Value,
    pub created_at: DateTime<Utc>,
    pub collected_at: DateTime<Utc>,
}

/// Append a batch of raw posts and return the number of rows written.
///
/// Uses a single `INSERT … SELECT * FROM UNNEST(…)` so the whole batch is
/// written in one round-trip. An empty batch is a no-op.
///
/// # Errors
///
/// Returns [`DbError::Encode`] if engagement counters cannot be encoded, or
/// [`DbError::Sqlx`] if the insert fails.
pub async fn insert_posts(pool: &PgPool, posts: &[Post]) -> Result<u64, DbError> {
    if posts.is_empty() {
        return Ok(0);
    }

    let mut source_ids: Vec<String> = Vec::with_capacity(posts.len());
    let mut platforms: Vec<String> = Vec::with_capacity(posts.len());
    let mut texts: Vec<String> = Vec::with_capacity(posts.len());
    let mut authors: Vec<String> = Vec::with_capacity(posts.len());
    let mut engagements: Vec<Value> = Vec::with_capacity(posts.len());
    let mut keywords: Vec<Value> = Vec::with_capacity(posts.len());
    let mut created: Vec<DateTime<Utc>> = Vec::with_capacity(posts.len());
    let mut collected: Vec<DateTime<Utc>> = Vec::with_capacity(posts.len());

    for post in posts {
        source_ids.push(post.id.clone());
        platforms.push(post.platform.as_str().to_string());
        texts.push(post.text.clone());
        authors.push(post.author_ref.clone());
        engagements.push(
            serde_json::to_value(&post.engagement).map_err(|e| DbError::Encode {
                context: "post engagement",
                source: e,
            })?,
        );
        keywords.push(Value::from(post.keywords.clone()));
        created.push(post.created_at);
        collected.push(post.collected_at);
    }

    let result = sqlx::query(
        "INSERT INTO raw_posts \
             (source_id, platform, text, author_ref, engagement, keywords, created_at, collected_at) \
         SELECT * FROM UNNEST(\
              $1::text[], $2::text[], $3::text[], $4::text[], \
              $5::jsonb[], $6::jsonb[], $7::timestamptz[], $8::timestamptz[])",
    )
    .bind(&source_ids)
    .bind(&platforms)
    .bind(&texts)
    .bind(&authors)
    .bind(&engagements)
    .bind(&keywords)
    .bind(&created)
    .bind(&collected)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// List posts created since `since`, newest first, optionally filtered by platform.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_posts(
    pool: &PgPool,
    platform: Option<Platform>,
    since: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<RawPostRow>, DbError> {
    let rows = sqlx::query_as::<_, RawPostRow>(
        "SELECT id, source_id, platform, text, author_ref, engagement, keywords, \
                created_at, collected_at \
         FROM raw_posts \
         WHERE created_at >= $1 \
           AND ($2::text IS NULL OR platform = $2) \
         ORDER BY created_at DESC, id DESC \
         LIMIT $3",
    )
    .bind(since)
    .bind(platform.map(|p| p.as_str()))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
