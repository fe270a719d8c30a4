//! Reddit API adapter (client-credentials OAuth).
//!
//! Each fetch exchanges the client credentials for a fresh token, then runs
//! one restricted search per configured subreddit and keyword.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use smsa_core::{Platform, UNKNOWN_AUTHOR};

use super::{keep_partial, require_credential, send_json, SourceAdapter, SourcePayload};
use crate::error::{FetchError, StartupError};

const DEFAULT_AUTH_URL: &str = "https://www.reddit.com";
const DEFAULT_API_URL: &str = "https://oauth.reddit.com";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Submission,
}

#[derive(Debug, Deserialize)]
struct Submission {
    id: Option<String>,
    title: Option<String>,
    selftext: Option<String>,
    author: Option<String>,
    created_utc: Option<f64>,
    ups: Option<i64>,
    downs: Option<i64>,
    score: Option<i64>,
    num_comments: Option<i64>,
}

pub struct RedditAdapter {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    subreddits: Vec<String>,
    auth_url: String,
    api_url: String,
}

impl RedditAdapter {
    /// # Errors
    ///
    /// Returns [`StartupError::HttpClient`] if the HTTP client cannot be built.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        user_agent: &str,
        subreddits: Vec<String>,
        timeout: Duration,
    ) -> Result<Self, StartupError> {
        // Reddit rejects requests without a descriptive User-Agent.
        Ok(Self {
            client: super::http_client(Platform::Reddit, timeout, user_agent)?,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            subreddits,
            auth_url: DEFAULT_AUTH_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
        })
    }

    /// Point token exchange and search at another host (used by tests).
    #[must_use]
    pub fn with_base_urls(mut self, auth_url: impl Into<String>, api_url: impl Into<String>) -> Self {
        self.auth_url = auth_url.into().trim_end_matches('/').to_string();
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn fetch_token(&self) -> Result<String, FetchError> {
        let request = self
            .client
            .post(format!("{}/api/v1/access_token", self.auth_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")]);
        let token: TokenResponse = send_json(Platform::Reddit, request).await?;
        Ok(token.access_token)
    }

    async fn search(
        &self,
        token: &str,
        subreddit: &str,
        keyword: &str,
        limit: usize,
    ) -> Result<Vec<Submission>, FetchError> {
        let params: [(&str, String); 5] = [
            ("q", keyword.to_string()),
            ("restrict_sr", "true".to_string()),
            ("sort", "relevance".to_string()),
            ("limit", limit.to_string()),
            ("raw_json", "1".to_string()),
        ];
        let request = self
            .client
            .get(format!("{}/r/{subreddit}/search", self.api_url))
            .bearer_auth(token)
            .query(&params);
        let listing: Listing = send_json(Platform::Reddit, request).await?;
        Ok(listing
            .data
            .children
            .into_iter()
            .map(|child| child.data)
            .collect())
    }

    fn to_payload(submission: Submission, keywords: &[String]) -> SourcePayload {
        let mut payload = SourcePayload::new(Platform::Reddit);
        payload.id = submission.id;
        payload.title = submission.title;
        payload.text = submission
            .selftext
            .filter(|body| body != "[deleted]" && body != "[removed]");
        payload.author = Some(
            submission
                .author
                .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
        );
        payload.created_at = submission.created_utc.and_then(from_epoch_secs);
        payload.keywords = keywords.to_vec();
        payload.metrics.insert("upvotes".to_string(), submission.ups);
        payload
            .metrics
            .insert("downvotes".to_string(), submission.downs);
        payload.metrics.insert("score".to_string(), submission.score);
        payload
            .metrics
            .insert("num_comments".to_string(), submission.num_comments);
        payload
    }
}

#[allow(clippy::cast_possible_truncation)]
fn from_epoch_secs(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    DateTime::from_timestamp(secs.trunc() as i64, 0)
}

#[async_trait]
impl SourceAdapter for RedditAdapter {
    fn platform(&self) -> Platform {
        Platform::Reddit
    }

    /// `limit` is split evenly across keywords for each subreddit search.
    async fn fetch(
        &self,
        keywords: &[String],
        limit: usize,
    ) -> Result<Vec<SourcePayload>, FetchError> {
        require_credential(Platform::Reddit, &self.client_id, "REDDIT_CLIENT_ID")?;
        require_credential(Platform::Reddit, &self.client_secret, "REDDIT_CLIENT_SECRET")?;
        if keywords.is_empty() || self.subreddits.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let token = self.fetch_token().await?;
        let per_keyword = (limit / keywords.len()).max(1);
        let mut payloads = Vec::new();

        for subreddit in &self.subreddits {
            for keyword in keywords {
                match self.search(&token, subreddit, keyword, per_keyword).await {
                    Ok(submissions) => payloads.extend(
                        submissions
                            .into_iter()
                            .map(|submission| Self::to_payload(submission, keywords)),
                    ),
                    Err(err) => return keep_partial(Platform::Reddit, payloads, err),
                }
            }
        }

        tracing::debug!(
            platform = %Platform::Reddit,
            subreddits = self.subreddits.len(),
            keywords = keywords.len(),
            collected = payloads.len(),
            "collected Reddit submissions"
        );
        Ok(payloads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_bodies_are_treated_as_missing() {
        let submission = Submission {
            id: Some("abc".to_string()),
            title: Some("A title long enough".to_string()),
            selftext: Some("[removed]".to_string()),
            author: None,
            created_utc: Some(1_700_000_000.0),
            ups: Some(3),
            downs: None,
            score: Some(3),
            num_comments: Some(1),
        };
        let payload = RedditAdapter::to_payload(submission, &["rust".to_string()]);
        assert!(payload.text.is_none());
        assert_eq!(payload.author.as_deref(), Some(UNKNOWN_AUTHOR));
        assert_eq!(payload.metrics.get("downvotes"), Some(&None));
        assert_eq!(
            payload.created_at.map(|t| t.timestamp()),
            Some(1_700_000_000)
        );
    }

    #[test]
    fn non_finite_timestamps_are_dropped() {
        assert!(from_epoch_secs(f64::NAN).is_none());
    }
}
