//! Pipeline command handlers: the scheduled loop and single cycles.

use anyhow::Context;
use smsa_core::{AppConfig, SentimentLabel, SourcesConfig};
use smsa_pipeline::setup::build_scheduler;
use smsa_pipeline::{CycleStats, MemoryStore, PgStore, PostStore};

fn load_sources(config: &AppConfig) -> anyhow::Result<SourcesConfig> {
    smsa_core::load_sources_config(&config.sources_path).with_context(|| {
        format!(
            "failed to load sources config from {}",
            config.sources_path.display()
        )
    })
}

/// Run cycles until SIGINT or SIGTERM, then let the in-flight cycle finish.
///
/// # Errors
///
/// Returns an error if the sources config cannot be loaded or storage cannot
/// be reached at startup.
pub(crate) async fn run_scheduled(config: &AppConfig) -> anyhow::Result<()> {
    let sources = load_sources(config)?;
    let store = PgStore::connect(config).await?;
    let mut scheduler = build_scheduler(config, &sources, Box::new(store))?;

    let handle = scheduler.handle();
    // Keep listening: a signal that lands before the loop is running is
    // ignored by the scheduler, and the next one must still get through.
    tokio::spawn(async move {
        loop {
            shutdown_signal().await;
            if !handle.stop() {
                tracing::warn!(state = %handle.state(), "scheduler not running, stop ignored");
            }
        }
    });

    let cycles = scheduler.start().await;
    let errors = scheduler.orchestrator().context().errors();
    for entry in errors.summary() {
        tracing::info!(
            category = %entry.category,
            component = %entry.component,
            count = entry.count,
            last_error = %entry.last_message,
            "error summary"
        );
    }
    println!("stopped after {cycles} cycle(s); {} error(s) recorded", errors.total());
    Ok(())
}

/// Run exactly one cycle and print its statistics.
///
/// # Errors
///
/// Returns an error if the sources config cannot be loaded or, unless
/// `dry_run` is set, storage cannot be reached.
pub(crate) async fn run_single_cycle(config: &AppConfig, dry_run: bool) -> anyhow::Result<()> {
    let sources = load_sources(config)?;
    let store: Box<dyn PostStore> = if dry_run {
        Box::new(MemoryStore::new())
    } else {
        Box::new(PgStore::connect(config).await?)
    };
    let mut scheduler = build_scheduler(config, &sources, store)?;

    let stats = scheduler.run_once().await;
    scheduler.shutdown().await;

    if let Some(stats) = stats {
        print_stats(&stats, dry_run);
    }
    Ok(())
}

fn print_stats(stats: &CycleStats, dry_run: bool) {
    println!("cycle {}", stats.cycle_id);
    for (platform, count) in &stats.collected_by_platform {
        println!("  {:<10}{count} collected", platform.as_str());
    }
    println!(
        "  {} unique posts, {} duplicates dropped, {} too short to score",
        stats.posts, stats.duplicates_dropped, stats.unscored
    );
    println!("{:<12}{:<8}PERCENT", "LABEL", "COUNT");
    for label in SentimentLabel::ALL {
        println!(
            "{:<12}{:<8}{:.2}",
            label.as_str(),
            stats.count(label),
            stats.percentage(label)
        );
    }
    if !stats.trending_hashtags.is_empty() {
        let tags: Vec<String> = stats
            .trending_hashtags
            .iter()
            .map(|(tag, n)| format!("#{tag} ({n})"))
            .collect();
        println!("trending: {}", tags.join(", "));
    }
    if dry_run {
        println!("dry-run: nothing written to the database");
    } else {
        println!(
            "persisted {} posts and {} results in {:.1}s",
            stats.posts_persisted,
            stats.results_persisted,
            stats.duration.as_secs_f64()
        );
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, finishing the current cycle");
}
