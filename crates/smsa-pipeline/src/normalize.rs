//! Record normalizer: heterogeneous source payloads into canonical [`Post`]s.
//!
//! [`normalize`] is total. Absent fields take defaults, so every payload
//! yields a post with a platform, an id, and a collection time.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use smsa_core::{Platform, Post, UNKNOWN_AUTHOR};

use crate::sources::SourcePayload;

/// Posts with fewer characters than this (after trimming) are stored but
/// never scored.
pub const MIN_SCORABLE_CHARS: usize = 10;

const SYNTHETIC_ID_PREFIX: &str = "gen-";
const SYNTHETIC_ID_HEX_CHARS: usize = 16;

/// Engagement counters each platform always reports, zero when missing.
fn expected_metrics(platform: Platform) -> &'static [&'static str] {
    match platform {
        Platform::Twitter => &["likes", "retweets"],
        Platform::Reddit => &["upvotes", "downvotes", "score", "num_comments"],
        Platform::Youtube => &[],
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn synthetic_id(platform: Platform, text: &str, created_at: DateTime<Utc>) -> String {
    let digest = Sha256::digest(format!("{platform}|{text}|{}", created_at.to_rfc3339()));
    let hex = format!("{digest:x}");
    format!("{SYNTHETIC_ID_PREFIX}{}", &hex[..SYNTHETIC_ID_HEX_CHARS])
}

/// Map one payload onto a [`Post`].
///
/// `text` falls back through `title` then `description` to the empty string.
/// A missing collection time takes `now`; a missing creation time takes the
/// collection time.
#[must_use]
pub fn normalize(payload: SourcePayload, now: DateTime<Utc>) -> Post {
    let SourcePayload {
        platform,
        id,
        text,
        title,
        description,
        author,
        created_at,
        collected_at,
        metrics,
        keywords,
    } = payload;

    let text = non_blank(text)
        .or_else(|| non_blank(title))
        .or_else(|| non_blank(description))
        .map(|t| t.trim().to_string())
        .unwrap_or_default();
    let collected_at = collected_at.unwrap_or(now);
    let created_at = created_at.unwrap_or(collected_at);
    let id = non_blank(id)
        .map(|id| id.trim().to_string())
        .unwrap_or_else(|| synthetic_id(platform, &text, created_at));
    let author_ref = non_blank(author).unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

    let mut engagement: BTreeMap<String, i64> = expected_metrics(platform)
        .iter()
        .map(|name| ((*name).to_string(), 0))
        .collect();
    for (name, value) in metrics {
        engagement.insert(name, value.unwrap_or(0));
    }

    Post {
        id,
        text,
        platform,
        created_at,
        collected_at,
        author_ref,
        engagement,
        keywords,
    }
}

/// Whether a post carries enough text to be scored.
#[must_use]
pub fn is_scorable(post: &Post) -> bool {
    post.text.trim().chars().count() >= MIN_SCORABLE_CHARS
}

#[derive(Debug, Default)]
pub struct NormalizedBatch {
    /// Unique by `(platform, id)`, in first-seen order.
    pub posts: Vec<Post>,
    pub duplicates_dropped: usize,
}

/// Normalize a merged batch and drop repeated `(platform, id)` pairs,
/// keeping the first occurrence.
#[must_use]
pub fn normalize_batch(payloads: Vec<SourcePayload>, now: DateTime<Utc>) -> NormalizedBatch {
    let mut seen: HashSet<(Platform, String)> = HashSet::with_capacity(payloads.len());
    let mut batch = NormalizedBatch::default();

    for payload in payloads {
        let post = normalize(payload, now);
        if seen.insert((post.platform, post.id.clone())) {
            batch.posts.push(post);
        } else {
            batch.duplicates_dropped += 1;
        }
    }

    batch
}
