//! Canonical records produced by the collection pipeline.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author marker used when a source reports no author (deleted accounts,
/// anonymous items).
pub const UNKNOWN_AUTHOR: &str = "[deleted]";

/// Polarity above this value is labelled positive; below its negation, negative.
const POLARITY_THRESHOLD: f64 = 0.1;

/// One tag per external source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    Reddit,
    Youtube,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Twitter, Platform::Reddit, Platform::Youtube];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Reddit => "reddit",
            Platform::Youtube => "youtube",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "twitter" => Ok(Platform::Twitter),
            "reddit" => Ok(Platform::Reddit),
            "youtube" => Ok(Platform::Youtube),
            other => Err(format!("unknown platform '{other}'")),
        }
    }
}

/// A raw post as delivered by a source adapter and normalized into one schema.
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Source-scoped identifier, unique per platform.
    pub id: String,
    /// May be empty when the source yields neither text, title nor description.
    pub text: String,
    pub platform: Platform,
    /// Source-reported creation time.
    pub created_at: DateTime<Utc>,
    /// Set at fetch time.
    pub collected_at: DateTime<Utc>,
    /// Author handle or id; [`UNKNOWN_AUTHOR`] when the source has none.
    pub author_ref: String,
    /// Named counters such as `likes`, `score`, `num_comments`.
    pub engagement: BTreeMap<String, i64>,
    /// Search terms that produced this item, in configured order.
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub const ALL: [SentimentLabel; 3] = [
        SentimentLabel::Positive,
        SentimentLabel::Neutral,
        SentimentLabel::Negative,
    ];

    /// Map a continuous polarity in `[-1, 1]` onto a label.
    #[must_use]
    pub fn from_polarity(polarity: f64) -> Self {
        if polarity > POLARITY_THRESHOLD {
            SentimentLabel::Positive
        } else if polarity < -POLARITY_THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "positive" => Ok(SentimentLabel::Positive),
            "neutral" => Ok(SentimentLabel::Neutral),
            "negative" => Ok(SentimentLabel::Negative),
            other => Err(format!("unknown sentiment label '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelProbabilities {
    pub negative: f64,
    pub neutral: f64,
    pub positive: f64,
}

/// Which scoring path produced a [`SentimentScore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreSource {
    Heuristic,
    Model,
}

impl ScoreSource {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreSource::Heuristic => "heuristic",
            ScoreSource::Model => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub label: SentimentLabel,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub probabilities: Option<LabelProbabilities>,
    /// Raw polarity for the heuristic path.
    pub polarity: Option<f64>,
    pub source: ScoreSource,
}

/// Sentiment derived from exactly one [`Post`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub post_id: String,
    pub platform: Platform,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub sentiment: SentimentScore,
    /// Stamped immediately before the storage insert.
    pub processed_at: Option<DateTime<Utc>>,
    pub author_ref: String,
    pub engagement: BTreeMap<String, i64>,
}

impl SentimentResult {
    /// Pair a post with its score. The text is copied so the result stands
    /// alone in storage.
    #[must_use]
    pub fn from_post(post: &Post, sentiment: SentimentScore) -> Self {
        Self {
            post_id: post.id.clone(),
            platform: post.platform,
            text: post.text.clone(),
            created_at: post.created_at,
            sentiment,
            processed_at: None,
            author_ref: post.author_ref.clone(),
            engagement: post.engagement.clone(),
        }
    }
}
