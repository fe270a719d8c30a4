//! Twitter API v2 recent-search adapter (app-only bearer token).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use smsa_core::Platform;

use super::{keep_partial, require_credential, send_json, SourceAdapter, SourcePayload};
use crate::error::{FetchError, StartupError};

const DEFAULT_BASE_URL: &str = "https://api.twitter.com";
const TWEET_FIELDS: &str = "created_at,author_id,public_metrics,lang";
const MIN_PAGE_SIZE: usize = 10;
const MAX_PAGE_SIZE: usize = 100;
const TARGET_LANG: &str = "en";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Tweet>,
    meta: Option<SearchMeta>,
}

#[derive(Debug, Deserialize)]
struct SearchMeta {
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: Option<String>,
    text: Option<String>,
    author_id: Option<String>,
    created_at: Option<DateTime<Utc>>,
    lang: Option<String>,
    public_metrics: Option<PublicMetrics>,
}

#[derive(Debug, Deserialize)]
struct PublicMetrics {
    like_count: Option<i64>,
    retweet_count: Option<i64>,
    reply_count: Option<i64>,
    quote_count: Option<i64>,
}

pub struct TwitterAdapter {
    client: reqwest::Client,
    bearer_token: String,
    base_url: String,
}

impl TwitterAdapter {
    /// # Errors
    ///
    /// Returns [`StartupError::HttpClient`] if the HTTP client cannot be built.
    pub fn new(
        bearer_token: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, StartupError> {
        Ok(Self {
            client: super::http_client(Platform::Twitter, timeout, user_agent)?,
            bearer_token: bearer_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the adapter at another API host (used by tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn to_payload(tweet: Tweet, keywords: &[String]) -> SourcePayload {
        let mut payload = SourcePayload::new(Platform::Twitter);
        payload.id = tweet.id;
        payload.text = tweet.text;
        payload.author = tweet.author_id;
        payload.created_at = tweet.created_at;
        payload.keywords = keywords.to_vec();
        if let Some(metrics) = tweet.public_metrics {
            payload.metrics.insert("likes".to_string(), metrics.like_count);
            payload
                .metrics
                .insert("retweets".to_string(), metrics.retweet_count);
            payload
                .metrics
                .insert("replies".to_string(), metrics.reply_count);
            payload.metrics.insert("quotes".to_string(), metrics.quote_count);
        }
        payload
    }
}

#[async_trait]
impl SourceAdapter for TwitterAdapter {
    fn platform(&self) -> Platform {
        Platform::Twitter
    }

    /// Pages through recent search until `limit` tweets have been seen.
    ///
    /// Non-English tweets count toward `limit` but are dropped silently.
    async fn fetch(
        &self,
        keywords: &[String],
        limit: usize,
    ) -> Result<Vec<SourcePayload>, FetchError> {
        require_credential(Platform::Twitter, &self.bearer_token, "TWITTER_BEARER_TOKEN")?;
        if keywords.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let query = keywords.join(" OR ");
        let url = format!("{}/2/tweets/search/recent", self.base_url);
        let mut payloads = Vec::new();
        let mut seen = 0usize;
        let mut next_token: Option<String> = None;

        while seen < limit {
            let page_size = (limit - seen).clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE);
            let mut params: Vec<(&str, String)> = vec![
                ("query", query.clone()),
                ("max_results", page_size.to_string()),
                ("tweet.fields", TWEET_FIELDS.to_string()),
            ];
            if let Some(token) = &next_token {
                params.push(("next_token", token.clone()));
            }

            let request = self
                .client
                .get(&url)
                .bearer_auth(&self.bearer_token)
                .query(&params);
            let page: SearchResponse = match send_json(Platform::Twitter, request).await {
                Ok(page) => page,
                Err(err) => return keep_partial(Platform::Twitter, payloads, err),
            };

            if page.data.is_empty() {
                break;
            }
            for tweet in page.data {
                if seen >= limit {
                    break;
                }
                seen += 1;
                if tweet.lang.as_deref() == Some(TARGET_LANG) {
                    payloads.push(Self::to_payload(tweet, keywords));
                }
            }

            next_token = page.meta.and_then(|meta| meta.next_token);
            if next_token.is_none() {
                break;
            }
        }

        tracing::debug!(
            platform = %Platform::Twitter,
            seen,
            kept = payloads.len(),
            "collected tweets"
        );
        Ok(payloads)
    }
}
