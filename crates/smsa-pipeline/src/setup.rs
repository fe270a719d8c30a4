//! Wiring: build adapters, the scoring gateway and the scheduler from config.

use std::time::Duration;

use smsa_core::{AppConfig, SourcesConfig};

use crate::context::PipelineContext;
use crate::error::StartupError;
use crate::gateway::ScoringGateway;
use crate::model::LinearModel;
use crate::orchestrator::{CycleOrchestrator, OrchestratorConfig};
use crate::scheduler::Scheduler;
use crate::sources::{RedditAdapter, SourceAdapter, TwitterAdapter, YoutubeAdapter};
use crate::storage::PostStore;

/// Load the trained model when one is configured.
///
/// A missing or unreadable artifact is not fatal: the gateway falls back to
/// the heuristic scorer for the whole run.
#[must_use]
pub fn build_gateway(config: &AppConfig) -> ScoringGateway {
    let Some(path) = &config.model_path else {
        tracing::info!("no model configured, scoring with the lexicon heuristic");
        return ScoringGateway::heuristic();
    };
    match LinearModel::from_path(path) {
        Ok(model) => ScoringGateway::with_model(Box::new(model)),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load sentiment model, scoring with the lexicon heuristic"
            );
            ScoringGateway::heuristic()
        }
    }
}

/// Build one adapter per platform with credentials configured, paired with
/// its per-cycle item limit. Platforms without credentials are skipped.
///
/// # Errors
///
/// Returns [`StartupError::HttpClient`] if an HTTP client cannot be built.
pub fn build_sources(
    config: &AppConfig,
    sources: &SourcesConfig,
) -> Result<Vec<(Box<dyn SourceAdapter>, usize)>, StartupError> {
    let timeout = Duration::from_secs(config.http_timeout_secs);
    let user_agent = config.reddit_user_agent.as_str();
    let mut built: Vec<(Box<dyn SourceAdapter>, usize)> = Vec::new();

    match &config.twitter_bearer_token {
        Some(token) => built.push((
            Box::new(TwitterAdapter::new(token.clone(), timeout, user_agent)?),
            sources.twitter.max_results,
        )),
        None => tracing::warn!("TWITTER_BEARER_TOKEN not set, twitter source disabled"),
    }

    match (&config.reddit_client_id, &config.reddit_client_secret) {
        (Some(id), Some(secret)) => built.push((
            Box::new(RedditAdapter::new(
                id.clone(),
                secret.clone(),
                user_agent,
                sources.reddit.subreddits.clone(),
                timeout,
            )?),
            sources.reddit.limit,
        )),
        _ => tracing::warn!(
            "REDDIT_CLIENT_ID or REDDIT_CLIENT_SECRET not set, reddit source disabled"
        ),
    }

    match &config.youtube_api_key {
        Some(key) => built.push((
            Box::new(YoutubeAdapter::new(key.clone(), timeout, user_agent)?),
            sources.youtube.max_results,
        )),
        None => tracing::warn!("YOUTUBE_API_KEY not set, youtube source disabled"),
    }

    if built.is_empty() {
        tracing::warn!("no sources configured, cycles will collect nothing");
    }
    Ok(built)
}

/// # Errors
///
/// Returns [`StartupError`] if a source cannot be built.
pub fn build_orchestrator(
    config: &AppConfig,
    sources: &SourcesConfig,
    store: Box<dyn PostStore>,
) -> Result<CycleOrchestrator, StartupError> {
    let mut orchestrator = CycleOrchestrator::new(
        build_gateway(config),
        store,
        OrchestratorConfig::from_app_config(config),
        PipelineContext::system(),
    );
    for (adapter, limit) in build_sources(config, sources)? {
        orchestrator = orchestrator.with_source(adapter, limit);
    }
    Ok(orchestrator)
}

/// # Errors
///
/// Returns [`StartupError`] if a source cannot be built.
pub fn build_scheduler(
    config: &AppConfig,
    sources: &SourcesConfig,
    store: Box<dyn PostStore>,
) -> Result<Scheduler, StartupError> {
    let orchestrator = build_orchestrator(config, sources, store)?;
    tracing::info!(
        sources = ?orchestrator.source_platforms(),
        keywords = ?sources.keywords,
        interval_secs = config.cycle_interval_secs,
        "pipeline assembled"
    );
    Ok(Scheduler::new(
        orchestrator,
        Duration::from_secs(config.cycle_interval_secs),
        sources.keywords.clone(),
    ))
}
