//! Database operations for the `sentiment_results` table.

use chrono::{DateTime, Utc};
use serde_json::Value;
use smsa_core::{Platform, SentimentLabel, SentimentResult};
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `sentiment_results` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SentimentResultRow {
    pub id: i64,
    pub post_id: String,
    pub platform: String,
    pub text: String,
    pub label: String,
    pub confidence: f64,
    pub probabilities: Option<Value>,
    pub polarity: Option<f64>,
    pub score_source: String,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub processed_at: DateTime<Utc>,
}

/// Results for one label within one clock hour.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct TrendBucket {
    /// Start of the hour, UTC.
    pub hour: DateTime<Utc>,
    pub label: String,
    pub count: i64,
}

/// Label counts over a time window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SentimentSummary {
    pub positive: i64,
    pub neutral: i64,
    pub negative: i64,
}

impl SentimentSummary {
    #[must_use]
    pub fn total(&self) -> i64 {
        self.positive + self.neutral + self.negative
    }

    #[must_use]
    pub fn count(&self, label: SentimentLabel) -> i64 {
        match label {
            SentimentLabel::Positive => self.positive,
            SentimentLabel::Neutral => self.neutral,
            SentimentLabel::Negative => self.negative,
        }
    }

    /// Share of `label` as a percentage rounded to two decimals; `0.0` when empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percentage(&self, label: SentimentLabel) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let pct = self.count(label) as f64 / total as f64 * 100.0;
        (pct * 100.0).round() / 100.0
    }
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Append a batch of sentiment results and return the number of rows written.
///
/// Results without a `processed_at` stamp are stamped with the current time.
///
/// # Errors
///
/// Returns [`DbError::Encode`] if probabilities or metadata cannot be encoded,
/// or [`DbError::Sqlx`] if the insert fails.
pub async fn insert_sentiment_results(
    pool: &PgPool,
    results: &[SentimentResult],
) -> Result<u64, DbError> {
    if results.is_empty() {
        return Ok(0);
    }

    let encode = |context: &'static str| move |e| DbError::Encode { context, source: e };

    let mut post_ids: Vec<String> = Vec::with_capacity(results.len());
    let mut platforms: Vec<String> = Vec::with_capacity(results.len());
    let mut texts: Vec<String> = Vec::with_capacity(results.len());
    let mut labels: Vec<String> = Vec::with_capacity(results.len());
    let mut confidences: Vec<f64> = Vec::with_capacity(results.len());
    let mut probabilities: Vec<Option<Value>> = Vec::with_capacity(results.len());
    let mut polarities: Vec<Option<f64>> = Vec::with_capacity(results.len());
    let mut sources: Vec<String> = Vec::with_capacity(results.len());
    let mut metadata: Vec<Value> = Vec::with_capacity(results.len());
    let mut created: Vec<DateTime<Utc>> = Vec::with_capacity(results.len());
    let mut processed: Vec<DateTime<Utc>> = Vec::with_capacity(results.len());

    for result in results {
        post_ids.push(result.post_id.clone());
        platforms.push(result.platform.as_str().to_string());
        texts.push(result.text.clone());
        labels.push(result.sentiment.label.as_str().to_string());
        confidences.push(result.sentiment.confidence);
        probabilities.push(
            result
                .sentiment
                .probabilities
                .as_ref()
                .map(serde_json::to_value)
                .transpose()
                .map_err(encode("sentiment probabilities"))?,
        );
        polarities.push(result.sentiment.polarity);
        sources.push(result.sentiment.source.as_str().to_string());
        metadata.push(serde_json::json!({
            "author_ref": result.author_ref,
            "engagement": serde_json::to_value(&result.engagement)
                .map_err(encode("result engagement"))?,
        }));
        created.push(result.created_at);
        processed.push(result.processed_at.unwrap_or_else(Utc::now));
    }

    let inserted = sqlx::query(
        "INSERT INTO sentiment_results \
             (post_id, platform, text, label, confidence, probabilities, polarity, \
              score_source, metadata, created_at, processed_at) \
         SELECT * FROM UNNEST(\
              $1::text[], $2::text[], $3::text[], $4::text[], $5::float8[], $6::jsonb[], \
              $7::float8[], $8::text[], $9::jsonb[], $10::timestamptz[], $11::timestamptz[])",
    )
    .bind(&post_ids)
    .bind(&platforms)
    .bind(&texts)
    .bind(&labels)
    .bind(&confidences)
    .bind(&probabilities)
    .bind(&polarities)
    .bind(&sources)
    .bind(&metadata)
    .bind(&created)
    .bind(&processed)
    .execute(pool)
    .await?;

    Ok(inserted.rows_affected())
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Count results per label processed since `since`, optionally for one platform.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn sentiment_summary(
    pool: &PgPool,
    platform: Option<Platform>,
    since: DateTime<Utc>,
) -> Result<SentimentSummary, DbError> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT label, COUNT(*) \
         FROM sentiment_results \
         WHERE processed_at >= $1 \
           AND ($2::text IS NULL OR platform = $2) \
         GROUP BY label",
    )
    .bind(since)
    .bind(platform.map(|p| p.as_str()))
    .fetch_all(pool)
    .await?;

    let mut summary = SentimentSummary::default();
    for (label, count) in rows {
        match label.parse::<SentimentLabel>() {
            Ok(SentimentLabel::Positive) => summary.positive = count,
            Ok(SentimentLabel::Neutral) => summary.neutral = count,
            Ok(SentimentLabel::Negative) => summary.negative = count,
            Err(_) => {}
        }
    }
    Ok(summary)
}

/// Count results per hour and label processed since `since`, oldest hour
/// first. Hours with no results for a label have no bucket.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn sentiment_trend(
    pool: &PgPool,
    platform: Option<Platform>,
    since: DateTime<Utc>,
) -> Result<Vec<TrendBucket>, DbError> {
    let rows = sqlx::query_as::<_, TrendBucket>(
        "SELECT date_trunc('hour', processed_at, 'UTC') AS hour, label, COUNT(*) AS count \
         FROM sentiment_results \
         WHERE processed_at >= $1 \
           AND ($2::text IS NULL OR platform = $2) \
         GROUP BY 1, 2 \
         ORDER BY 1, 2",
    )
    .bind(since)
    .bind(platform.map(|p| p.as_str()))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Return the most confident results for `label`, newest first among ties.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn top_sentiment_results(
    pool: &PgPool,
    label: SentimentLabel,
    platform: Option<Platform>,
    limit: i64,
) -> Result<Vec<SentimentResultRow>, DbError> {
    let rows = sqlx::query_as::<_, SentimentResultRow>(
        "SELECT id, post_id, platform, text, label, confidence, probabilities, polarity, \
                score_source, metadata, created_at, processed_at \
         FROM sentiment_results \
         WHERE label = $1 \
           AND ($2::text IS NULL OR platform = $2) \
         ORDER BY confidence DESC, processed_at DESC \
         LIMIT $3",
    )
    .bind(label.as_str())
    .bind(platform.map(|p| p.as_str()))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
