//! Source adapters: one per external platform, all behind [`SourceAdapter`].

pub mod reddit;
pub mod twitter;
pub mod youtube;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use smsa_core::Platform;

use crate::error::FetchError;

pub use reddit::RedditAdapter;
pub use twitter::TwitterAdapter;
pub use youtube::YoutubeAdapter;

/// An item as a source delivered it, before normalization.
///
/// Every field a source may omit is optional; the normalizer fills defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcePayload {
    pub platform: Platform,
    pub id: Option<String>,
    pub text: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub collected_at: Option<DateTime<Utc>>,
    pub metrics: BTreeMap<String, Option<i64>>,
    pub keywords: Vec<String>,
}

impl SourcePayload {
    /// An empty payload for `platform`, stamped as collected now.
    #[must_use]
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            id: None,
            text: None,
            title: None,
            description: None,
            author: None,
            created_at: None,
            collected_at: Some(Utc::now()),
            metrics: BTreeMap::new(),
            keywords: Vec::new(),
        }
    }
}

/// A platform client that fetches items matching a keyword set.
///
/// One call is one attempt; the orchestrator wraps each call in the retry
/// policy. Implementations own their HTTP client and credentials.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    /// Fetch up to `limit` items matching any of `keywords`.
    ///
    /// Items gathered before a later request fails are returned rather than
    /// discarded; an error is only returned when nothing was gathered.
    async fn fetch(
        &self,
        keywords: &[String],
        limit: usize,
    ) -> Result<Vec<SourcePayload>, FetchError>;
}

/// Turn a failure into a partial success when earlier requests delivered items.
pub(crate) fn keep_partial(
    platform: Platform,
    collected: Vec<SourcePayload>,
    err: FetchError,
) -> Result<Vec<SourcePayload>, FetchError> {
    if collected.is_empty() {
        return Err(err);
    }
    tracing::warn!(
        %platform,
        kept = collected.len(),
        error = %err,
        "request failed mid-fetch, keeping items already collected"
    );
    Ok(collected)
}

/// Send a request and decode a JSON body, mapping HTTP failures to [`FetchError`].
pub(crate) async fn send_json<T: DeserializeOwned>(
    platform: Platform,
    request: reqwest::RequestBuilder,
) -> Result<T, FetchError> {
    let response = request
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(platform, e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(FetchError::from_status(platform, status.as_u16(), &body));
    }

    let body = response
        .text()
        .await
        .map_err(|e| FetchError::from_reqwest(platform, e))?;
    serde_json::from_str(&body).map_err(|e| FetchError::Parse {
        platform,
        detail: e.to_string(),
    })
}

/// Build a `reqwest::Client` with the shared timeout and user agent.
pub(crate) fn http_client(
    platform: Platform,
    timeout: std::time::Duration,
    user_agent: &str,
) -> Result<reqwest::Client, crate::error::StartupError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(std::time::Duration::from_secs(10)))
        .user_agent(user_agent)
        .build()
        .map_err(|source| crate::error::StartupError::HttpClient { platform, source })
}

/// Reject blank credentials before any request is made.
pub(crate) fn require_credential(
    platform: Platform,
    value: &str,
    what: &'static str,
) -> Result<(), FetchError> {
    if value.trim().is_empty() {
        return Err(FetchError::NotConfigured { platform, what });
    }
    Ok(())
}
