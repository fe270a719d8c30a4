//! Per-cycle aggregates, logged at the end of every cycle.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use smsa_core::{Platform, Post, SentimentLabel};
use uuid::Uuid;

/// Hashtags need at least this many mentions in one cycle to trend.
pub const TRENDING_MIN_MENTIONS: usize = 5;

static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\w+)").expect("valid hashtag regex"));

#[derive(Debug, Clone, PartialEq)]
pub struct CycleStats {
    pub cycle_id: Uuid,
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
    /// Number of sentiment results produced.
    pub total: usize,
    /// Items each source delivered, before deduplication.
    pub collected_by_platform: BTreeMap<Platform, usize>,
    pub duplicates_dropped: usize,
    /// Unique posts handed to storage.
    pub posts: usize,
    /// Posts too short to score.
    pub unscored: usize,
    pub posts_persisted: u64,
    pub results_persisted: u64,
    /// `(hashtag, mentions)`, most mentioned first.
    pub trending_hashtags: Vec<(String, usize)>,
    pub duration: Duration,
}

impl CycleStats {
    #[must_use]
    pub fn new(cycle_id: Uuid) -> Self {
        Self {
            cycle_id,
            positive: 0,
            neutral: 0,
            negative: 0,
            total: 0,
            collected_by_platform: BTreeMap::new(),
            duplicates_dropped: 0,
            posts: 0,
            unscored: 0,
            posts_persisted: 0,
            results_persisted: 0,
            trending_hashtags: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    pub fn record_label(&mut self, label: SentimentLabel) {
        match label {
            SentimentLabel::Positive => self.positive += 1,
            SentimentLabel::Neutral => self.neutral += 1,
            SentimentLabel::Negative => self.negative += 1,
        }
        self.total += 1;
    }

    #[must_use]
    pub fn count(&self, label: SentimentLabel) -> usize {
        match label {
            SentimentLabel::Positive => self.positive,
            SentimentLabel::Neutral => self.neutral,
            SentimentLabel::Negative => self.negative,
        }
    }

    /// Share of `label` in percent, two decimals; `0.0` for an empty cycle.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percentage(&self, label: SentimentLabel) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let pct = self.count(label) as f64 / self.total as f64 * 100.0;
        (pct * 100.0).round() / 100.0
    }

    #[must_use]
    pub fn collected(&self) -> usize {
        self.collected_by_platform.values().sum()
    }
}

/// Hashtags mentioned at least `min_mentions` times across `posts`.
///
/// Matching is case-insensitive. Ties are ordered alphabetically.
#[must_use]
pub fn trending_hashtags(posts: &[Post], min_mentions: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for post in posts {
        for caps in HASHTAG_RE.captures_iter(&post.text) {
            *counts.entry(caps[1].to_lowercase()).or_default() += 1;
        }
    }

    let mut trending: Vec<(String, usize)> = counts
        .into_iter()
        .filter(|(_, count)| *count >= min_mentions)
        .collect();
    trending.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    trending
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn post(text: &str) -> Post {
        Post {
            id: text.to_string(),
            text: text.to_string(),
            platform: Platform::Twitter,
            created_at: Utc::now(),
            collected_at: Utc::now(),
            author_ref: "a".to_string(),
            engagement: BTreeMap::new(),
            keywords: Vec::new(),
        }
    }

    #[test]
    fn empty_cycle_has_zero_percentages() {
        let stats = CycleStats::new(Uuid::nil());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.percentage(SentimentLabel::Positive), 0.0);
    }

    #[test]
    fn percentages_round_to_two_decimals() {
        let mut stats = CycleStats::new(Uuid::nil());
        stats.record_label(SentimentLabel::Positive);
        stats.record_label(SentimentLabel::Negative);
        stats.record_label(SentimentLabel::Negative);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.percentage(SentimentLabel::Positive), 33.33);
        assert_eq!(stats.percentage(SentimentLabel::Negative), 66.67);
        assert_eq!(stats.percentage(SentimentLabel::Neutral), 0.0);
    }

    #[test]
    fn hashtags_need_five_mentions_to_trend() {
        let mut posts: Vec<Post> = (0..5).map(|i| post(&format!("#Rust post {i}"))).collect();
        posts.extend((0..4).map(|i| post(&format!("#tokio post {i}"))));
        posts.push(post("#rust and #Tokio again"));
        posts.push(post("#rust #rust"));

        let trending = trending_hashtags(&posts, TRENDING_MIN_MENTIONS);
        assert_eq!(
            trending,
            vec![("rust".to_string(), 8), ("tokio".to_string(), 5)]
        );
    }
}
