//! YouTube Data API v3 video search adapter.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use smsa_core::Platform;

use super::{require_credential, send_json, SourceAdapter, SourcePayload};
use crate::error::{FetchError, StartupError};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";
/// Largest `maxResults` the search endpoint accepts.
const MAX_PAGE_SIZE: usize = 50;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: Option<ItemId>,
    snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: Option<String>,
    description: Option<String>,
    channel_title: Option<String>,
    published_at: Option<String>,
}

pub struct YoutubeAdapter {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl YoutubeAdapter {
    /// # Errors
    ///
    /// Returns [`StartupError::HttpClient`] if the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, StartupError> {
        Ok(Self {
            client: super::http_client(Platform::Youtube, timeout, user_agent)?,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the adapter at another API host (used by tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn to_payload(item: SearchItem, keywords: &[String]) -> SourcePayload {
        let mut payload = SourcePayload::new(Platform::Youtube);
        payload.id = item.id.and_then(|id| id.video_id);
        if let Some(snippet) = item.snippet {
            payload.title = snippet.title;
            payload.description = snippet.description;
            payload.author = snippet.channel_title;
            payload.created_at = snippet
                .published_at
                .as_deref()
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|dt| dt.with_timezone(&Utc));
        }
        payload.keywords = keywords.to_vec();
        payload
    }
}

#[async_trait]
impl SourceAdapter for YoutubeAdapter {
    fn platform(&self) -> Platform {
        Platform::Youtube
    }

    /// Single relevance-ordered search page; quota errors come back as 403.
    async fn fetch(
        &self,
        keywords: &[String],
        limit: usize,
    ) -> Result<Vec<SourcePayload>, FetchError> {
        require_credential(Platform::Youtube, &self.api_key, "YOUTUBE_API_KEY")?;
        if keywords.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let params: [(&str, String); 6] = [
            ("part", "snippet".to_string()),
            ("q", keywords.join(" OR ")),
            ("type", "video".to_string()),
            ("order", "relevance".to_string()),
            ("maxResults", limit.min(MAX_PAGE_SIZE).to_string()),
            ("key", self.api_key.clone()),
        ];
        let request = self
            .client
            .get(format!("{}/youtube/v3/search", self.base_url))
            .query(&params);
        let response: SearchResponse = send_json(Platform::Youtube, request).await?;

        let payloads: Vec<SourcePayload> = response
            .items
            .into_iter()
            .map(|item| Self::to_payload(item, keywords))
            .collect();

        tracing::debug!(
            platform = %Platform::Youtube,
            collected = payloads.len(),
            "collected YouTube videos"
        );
        Ok(payloads)
    }
}
