//! Cycle orchestrator: one collect, normalize, score, persist round.
//!
//! Stages run strictly in order and never loop back. A failure in any stage
//! is counted and logged, and the cycle moves on with whatever survived.

use std::fmt;
use std::time::Duration;

use futures::future::join_all;
use smsa_core::{AppConfig, Platform, SentimentLabel, SentimentResult};
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::context::{ErrorCategory, PipelineContext};
use crate::gateway::ScoringGateway;
use crate::normalize::{is_scorable, normalize_batch};
use crate::retry::{fetch_with_retry, FetchOutcome, RetryPolicy};
use crate::sources::{SourceAdapter, SourcePayload};
use crate::stats::{trending_hashtags, CycleStats, TRENDING_MIN_MENTIONS};
use crate::storage::PostStore;

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    Collecting,
    Normalizing,
    Scoring,
    Persisting,
    Done,
}

impl fmt::Display for CycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CycleStage::Collecting => "collecting",
            CycleStage::Normalizing => "normalizing",
            CycleStage::Scoring => "scoring",
            CycleStage::Persisting => "persisting",
            CycleStage::Done => "done",
        })
    }
}

/// A registered adapter and the item limit it is asked for each cycle.
struct SourceSlot {
    adapter: Box<dyn SourceAdapter>,
    limit: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Upper bound on one adapter's fetch, retries and back-off included.
    ///
    /// With the default 30 s bound and back-off waits of 30 s or more, a
    /// failed first attempt leaves the source empty for the cycle; raise
    /// the bound above `call + wait + call` for retries to land.
    pub fetch_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
        }
    }
}

impl OrchestratorConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
            retry: RetryPolicy::from_app_config(config),
        }
    }
}

pub struct CycleOrchestrator {
    sources: Vec<SourceSlot>,
    gateway: ScoringGateway,
    store: Box<dyn PostStore>,
    config: OrchestratorConfig,
    context: PipelineContext,
    released: bool,
}

enum SourceResult {
    Finished(FetchOutcome<SourcePayload>),
    TimedOut,
}

impl CycleOrchestrator {
    #[must_use]
    pub fn new(
        gateway: ScoringGateway,
        store: Box<dyn PostStore>,
        config: OrchestratorConfig,
        context: PipelineContext,
    ) -> Self {
        Self {
            sources: Vec::new(),
            gateway,
            store,
            config,
            context,
            released: false,
        }
    }

    /// Register an adapter asked for up to `limit` items per cycle.
    #[must_use]
    pub fn with_source(mut self, adapter: Box<dyn SourceAdapter>, limit: usize) -> Self {
        self.sources.push(SourceSlot { adapter, limit });
        self
    }

    #[must_use]
    pub fn source_platforms(&self) -> Vec<Platform> {
        self.sources.iter().map(|s| s.adapter.platform()).collect()
    }

    #[must_use]
    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut PipelineContext {
        &mut self.context
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Run one full cycle for `keywords`. Never fails.
    pub async fn run_cycle(&mut self, keywords: &[String]) -> CycleStats {
        let cycle_id = Uuid::new_v4();
        let span = tracing::info_span!("cycle", %cycle_id);
        self.run_stages(cycle_id, keywords).instrument(span).await
    }

    async fn run_stages(&mut self, cycle_id: Uuid, keywords: &[String]) -> CycleStats {
        let started = Instant::now();
        let mut stats = CycleStats::new(cycle_id);

        // Collecting
        let stage_started = Instant::now();
        let payloads = self.collect(keywords, &mut stats).await;
        log_stage(CycleStage::Collecting, stage_started);

        if payloads.is_empty() {
            stats.duration = started.elapsed();
            tracing::info!(
                duration_ms = stats.duration.as_millis(),
                "no new posts collected this cycle"
            );
            return stats;
        }

        // Normalizing
        let stage_started = Instant::now();
        let batch = normalize_batch(payloads, self.context.now());
        stats.duplicates_dropped = batch.duplicates_dropped;
        stats.posts = batch.posts.len();
        stats.trending_hashtags = trending_hashtags(&batch.posts, TRENDING_MIN_MENTIONS);
        log_stage(CycleStage::Normalizing, stage_started);

        // Scoring
        let stage_started = Instant::now();
        let mut results: Vec<SentimentResult> = Vec::with_capacity(batch.posts.len());
        for post in &batch.posts {
            if !is_scorable(post) {
                stats.unscored += 1;
                continue;
            }
            let (score, err) = self.gateway.score_detailed(&post.text);
            if let Some(err) = err {
                self.context
                    .record_error(ErrorCategory::Scoring, "model", err.to_string());
            }
            stats.record_label(score.label);
            results.push(SentimentResult::from_post(post, score));
        }
        log_stage(CycleStage::Scoring, stage_started);

        // Persisting
        let stage_started = Instant::now();
        match self.store.insert_posts(&batch.posts).await {
            Ok(written) => stats.posts_persisted = written,
            Err(err) => {
                tracing::error!(
                    operation = "insert_posts",
                    batch = batch.posts.len(),
                    error = %err,
                    "raw post batch lost for this cycle"
                );
                self.context
                    .record_error(ErrorCategory::Storage, "insert_posts", err.to_string());
            }
        }

        if !results.is_empty() {
            let processed_at = self.context.now();
            for result in &mut results {
                result.processed_at = Some(processed_at);
            }
            match self.store.insert_sentiment_results(&results).await {
                Ok(written) => stats.results_persisted = written,
                Err(err) => {
                    tracing::error!(
                        operation = "insert_sentiment_results",
                        batch = results.len(),
                        error = %err,
                        "sentiment batch lost for this cycle"
                    );
                    self.context.record_error(
                        ErrorCategory::Storage,
                        "insert_sentiment_results",
                        err.to_string(),
                    );
                }
            }
        }
        log_stage(CycleStage::Persisting, stage_started);

        stats.duration = started.elapsed();
        tracing::info!(
            stage = %CycleStage::Done,
            collected = stats.collected(),
            posts = stats.posts,
            duplicates = stats.duplicates_dropped,
            unscored = stats.unscored,
            total = stats.total,
            positive_pct = stats.percentage(SentimentLabel::Positive),
            neutral_pct = stats.percentage(SentimentLabel::Neutral),
            negative_pct = stats.percentage(SentimentLabel::Negative),
            posts_persisted = stats.posts_persisted,
            results_persisted = stats.results_persisted,
            trending = ?stats.trending_hashtags,
            duration_ms = stats.duration.as_millis(),
            "cycle completed"
        );
        stats
    }

    /// Fan out to every adapter at once and wait for all of them, each
    /// bounded by the fetch timeout.
    async fn collect(&mut self, keywords: &[String], stats: &mut CycleStats) -> Vec<SourcePayload> {
        let retry = self.config.retry;
        let fetch_timeout = self.config.fetch_timeout;

        let fetches = self.sources.iter().map(|slot| {
            let platform = slot.adapter.platform();
            let retry = &retry;
            async move {
                let fetch = fetch_with_retry(retry, platform, move || {
                    slot.adapter.fetch(keywords, slot.limit)
                });
                let result = match tokio::time::timeout(fetch_timeout, fetch).await {
                    Ok(outcome) => SourceResult::Finished(outcome),
                    Err(_) => SourceResult::TimedOut,
                };
                (platform, result)
            }
        });
        let finished = join_all(fetches).await;

        let mut payloads = Vec::new();
        for (platform, result) in finished {
            match result {
                SourceResult::Finished(outcome) => {
                    for err in &outcome.errors {
                        self.context.record_error(
                            ErrorCategory::Fetch,
                            platform.as_str(),
                            err.to_string(),
                        );
                    }
                    tracing::info!(
                        %platform,
                        items = outcome.items.len(),
                        attempts = outcome.attempts,
                        "source finished"
                    );
                    *stats.collected_by_platform.entry(platform).or_default() +=
                        outcome.items.len();
                    payloads.extend(outcome.items);
                }
                SourceResult::TimedOut => {
                    tracing::warn!(
                        %platform,
                        timeout_secs = fetch_timeout.as_secs(),
                        "source exceeded its fetch bound, contributing no results"
                    );
                    self.context.record_error(
                        ErrorCategory::Timeout,
                        platform.as_str(),
                        format!("fetch exceeded {}s", fetch_timeout.as_secs()),
                    );
                    stats.collected_by_platform.entry(platform).or_default();
                }
            }
        }
        payloads
    }

    /// Release the scoring model and the storage connection.
    ///
    /// Only the first call does anything; later calls return `false`.
    pub async fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;
        self.gateway.release();
        self.store.close().await;
        tracing::info!("pipeline resources released");
        true
    }
}

fn log_stage(stage: CycleStage, started: Instant) {
    tracing::debug!(
        %stage,
        elapsed_ms = started.elapsed().as_millis(),
        "stage finished"
    );
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::context::ManualClock;
    use crate::error::FetchError;
    use crate::storage::MemoryStore;

    /// Returns a fixed set of items, or a fixed error, after an optional delay.
    struct StubAdapter {
        platform: Platform,
        items: Vec<(&'static str, &'static str)>,
        error: Option<fn(Platform) -> FetchError>,
        delay: Duration,
        calls: Arc<AtomicU32>,
    }

    impl StubAdapter {
        fn ok(platform: Platform, items: Vec<(&'static str, &'static str)>) -> Self {
            Self {
                platform,
                items,
                error: None,
                delay: Duration::ZERO,
                calls: Arc::new(AtomicU32::new(0)),
            }
        }

        fn failing(platform: Platform, error: fn(Platform) -> FetchError) -> Self {
            Self {
                error: Some(error),
                ..Self::ok(platform, Vec::new())
            }
        }
    }

    #[async_trait]
    impl SourceAdapter for StubAdapter {
        fn platform(&self) -> Platform {
            self.platform
        }

        async fn fetch(
            &self,
            keywords: &[String],
            _limit: usize,
        ) -> Result<Vec<SourcePayload>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if let Some(error) = self.error {
                return Err(error(self.platform));
            }
            Ok(self
                .items
                .iter()
                .map(|(id, text)| {
                    let mut p = SourcePayload::new(self.platform);
                    p.id = Some((*id).to_string());
                    p.text = Some((*text).to_string());
                    p.keywords = keywords.to_vec();
                    p
                })
                .collect())
        }
    }

    /// Times out on its first call and answers on every later one, taking
    /// one second per call.
    struct FailsOnce {
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl SourceAdapter for FailsOnce {
        fn platform(&self) -> Platform {
            Platform::Youtube
        }

        async fn fetch(
            &self,
            _keywords: &[String],
            _limit: usize,
        ) -> Result<Vec<SourcePayload>, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(1)).await;
            if n == 0 {
                return Err(FetchError::Timeout {
                    platform: Platform::Youtube,
                });
            }
            let mut p = SourcePayload::new(Platform::Youtube);
            p.id = Some("vid-1".to_string());
            p.text = Some("worth the wait after a retry".to_string());
            Ok(vec![p])
        }
    }

    fn unauthorized(platform: Platform) -> FetchError {
        FetchError::Unauthorized {
            platform,
            detail: "bad token".to_string(),
        }
    }

    fn forbidden(platform: Platform) -> FetchError {
        FetchError::Forbidden {
            platform,
            detail: "quotaExceeded".to_string(),
        }
    }

    fn keywords() -> Vec<String> {
        vec!["rust".to_string()]
    }

    fn orchestrator(store: Arc<MemoryStore>) -> CycleOrchestrator {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap(),
        ));
        CycleOrchestrator::new(
            ScoringGateway::heuristic(),
            Box::new(store),
            OrchestratorConfig::default(),
            PipelineContext::new(clock),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn one_good_source_and_two_fatal_failures_yield_three_results() {
        let store = Arc::new(MemoryStore::new());
        let mut orch = orchestrator(Arc::clone(&store))
            .with_source(
                Box::new(StubAdapter::ok(
                    Platform::Twitter,
                    vec![
                        ("1", "Rust 1.80 is a great release"),
                        ("2", "The borrow checker is awful today"),
                        ("3", "Shipping a new crate this weekend"),
                    ],
                )),
                50,
            )
            .with_source(Box::new(StubAdapter::failing(Platform::Reddit, unauthorized)), 50)
            .with_source(Box::new(StubAdapter::failing(Platform::Youtube, forbidden)), 20);

        let stats = orch.run_cycle(&keywords()).await;

        assert_eq!(stats.total, 3);
        assert_eq!(stats.positive + stats.neutral + stats.negative, 3);
        assert_eq!(store.posts().len(), 3);
        assert_eq!(store.results().len(), 3);
        assert_eq!(stats.posts_persisted, 3);
        assert_eq!(stats.results_persisted, 3);

        let post_ids: Vec<String> = store.posts().into_iter().map(|p| p.id).collect();
        for result in store.results() {
            assert!(post_ids.contains(&result.post_id));
            assert!(result.processed_at.is_some());
        }

        let errors = orch.context().errors();
        assert_eq!(errors.count(ErrorCategory::Fetch, "reddit"), 1);
        assert_eq!(errors.count(ErrorCategory::Fetch, "youtube"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_ids_reach_storage_once() {
        let store = Arc::new(MemoryStore::new());
        let mut orch = orchestrator(Arc::clone(&store)).with_source(
            Box::new(StubAdapter::ok(
                Platform::Reddit,
                vec![
                    ("dup", "first copy of a long enough post"),
                    ("dup", "second copy of a long enough post"),
                ],
            )),
            50,
        );

        let stats = orch.run_cycle(&keywords()).await;

        assert_eq!(store.posts().len(), 1);
        assert_eq!(store.results().len(), 1);
        assert_eq!(stats.duplicates_dropped, 1);
        assert_eq!(stats.collected(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn short_posts_are_stored_but_not_scored() {
        let store = Arc::new(MemoryStore::new());
        let mut orch = orchestrator(Arc::clone(&store)).with_source(
            Box::new(StubAdapter::ok(
                Platform::Twitter,
                vec![("a", "lol"), ("b", "this one is long enough to score")],
            )),
            50,
        );

        let stats = orch.run_cycle(&keywords()).await;

        assert_eq!(store.posts().len(), 2);
        assert_eq!(store.results().len(), 1);
        assert_eq!(store.results()[0].post_id, "b");
        assert_eq!(stats.unscored, 1);
        assert_eq!(stats.total, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_source_is_abandoned_at_the_fetch_bound() {
        let store = Arc::new(MemoryStore::new());
        let mut slow = StubAdapter::ok(Platform::Youtube, vec![("late", "arrives far too late")]);
        slow.delay = Duration::from_secs(120);

        let mut orch = orchestrator(Arc::clone(&store))
            .with_source(Box::new(slow), 20)
            .with_source(
                Box::new(StubAdapter::ok(
                    Platform::Twitter,
                    vec![("fast", "arrives well within the bound")],
                )),
                50,
            );

        let started = Instant::now();
        let stats = orch.run_cycle(&keywords()).await;

        assert_eq!(started.elapsed(), Duration::from_secs(30));
        assert_eq!(stats.total, 1);
        assert_eq!(stats.collected_by_platform.get(&Platform::Youtube), Some(&0));
        assert_eq!(
            orch.context().errors().count(ErrorCategory::Timeout, "youtube"),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn default_fetch_bound_covers_the_whole_retry_sequence() {
        let store = Arc::new(MemoryStore::new());
        let calls = Arc::new(AtomicU32::new(0));
        let mut orch = orchestrator(Arc::clone(&store)).with_source(
            Box::new(FailsOnce {
                calls: Arc::clone(&calls),
            }),
            20,
        );

        let started = Instant::now();
        let stats = orch.run_cycle(&keywords()).await;

        // 1 s call + 30 s transient wait cannot fit in the 30 s bound.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::from_secs(30));
        assert_eq!(stats.total, 0);
        assert!(store.posts().is_empty());
        assert_eq!(
            orch.context().errors().count(ErrorCategory::Timeout, "youtube"),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn wider_fetch_bound_lets_a_retry_complete() {
        let store = Arc::new(MemoryStore::new());
        let calls = Arc::new(AtomicU32::new(0));
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap(),
        ));
        let mut orch = CycleOrchestrator::new(
            ScoringGateway::heuristic(),
            Box::new(Arc::clone(&store)),
            OrchestratorConfig {
                fetch_timeout: Duration::from_secs(60),
                retry: RetryPolicy::default(),
            },
            PipelineContext::new(clock),
        )
        .with_source(
            Box::new(FailsOnce {
                calls: Arc::clone(&calls),
            }),
            20,
        );

        let started = Instant::now();
        let stats = orch.run_cycle(&keywords()).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(started.elapsed(), Duration::from_secs(32));
        assert_eq!(stats.total, 1);
        assert_eq!(store.posts().len(), 1);
        let errors = orch.context().errors();
        assert_eq!(errors.count(ErrorCategory::Fetch, "youtube"), 1);
        assert_eq!(errors.count(ErrorCategory::Timeout, "youtube"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_cycle_is_a_no_op() {
        let store = Arc::new(MemoryStore::new());
        let mut orch = orchestrator(Arc::clone(&store))
            .with_source(Box::new(StubAdapter::failing(Platform::Reddit, unauthorized)), 50);

        let stats = orch.run_cycle(&keywords()).await;

        assert_eq!(stats.total, 0);
        assert!(store.posts().is_empty());
        assert_eq!(stats.percentage(SentimentLabel::Positive), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn storage_failure_does_not_abort_the_cycle() {
        let store = Arc::new(MemoryStore::new());
        store.close().await;
        let mut orch = orchestrator(Arc::clone(&store)).with_source(
            Box::new(StubAdapter::ok(
                Platform::Twitter,
                vec![("1", "a perfectly good post to score")],
            )),
            50,
        );

        let stats = orch.run_cycle(&keywords()).await;

        assert_eq!(stats.total, 1);
        assert_eq!(stats.posts_persisted, 0);
        assert_eq!(stats.results_persisted, 0);
        let errors = orch.context().errors();
        assert_eq!(errors.count(ErrorCategory::Storage, "insert_posts"), 1);
        assert_eq!(
            errors.count(ErrorCategory::Storage, "insert_sentiment_results"),
            1
        );
    }

    #[tokio::test]
    async fn release_closes_storage_exactly_once() {
        let store = Arc::new(MemoryStore::new());
        let mut orch = orchestrator(Arc::clone(&store));

        assert!(orch.release().await);
        assert!(!orch.release().await);
        assert_eq!(store.close_calls(), 1);
        assert!(orch.is_released());
    }
}
