//! Storage seam: append-only batch writers behind [`PostStore`].

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use smsa_core::{AppConfig, Post, SentimentResult};
use sqlx::PgPool;

use crate::error::{StartupError, StorageError};

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Append raw posts; returns the number written.
    async fn insert_posts(&self, posts: &[Post]) -> Result<u64, StorageError>;

    /// Append sentiment results; returns the number written.
    async fn insert_sentiment_results(
        &self,
        results: &[SentimentResult],
    ) -> Result<u64, StorageError>;

    /// Release the underlying connection.
    async fn close(&self);
}

/// Postgres-backed store.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect, verify the connection and apply pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError::Storage`] if any step fails. This is the only
    /// fatal pipeline error and is never retried.
    pub async fn connect(config: &AppConfig) -> Result<Self, StartupError> {
        let pool_config = smsa_db::PoolConfig::from_app_config(config);
        let pool = smsa_db::connect_pool(&config.database_url, pool_config)
            .await
            .map_err(|e| StartupError::Storage(e.into()))?;
        smsa_db::ping(&pool)
            .await
            .map_err(|e| StartupError::Storage(e.into()))?;
        let applied = smsa_db::run_migrations(&pool)
            .await
            .map_err(|e| StartupError::Storage(e.into()))?;
        tracing::info!(applied, "storage connected");
        Ok(Self { pool })
    }

    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl PostStore for PgStore {
    async fn insert_posts(&self, posts: &[Post]) -> Result<u64, StorageError> {
        smsa_db::insert_posts(&self.pool, posts)
            .await
            .map_err(|source| StorageError::Database {
                operation: "insert_posts",
                source,
            })
    }

    async fn insert_sentiment_results(
        &self,
        results: &[SentimentResult],
    ) -> Result<u64, StorageError> {
        smsa_db::insert_sentiment_results(&self.pool, results)
            .await
            .map_err(|source| StorageError::Database {
                operation: "insert_sentiment_results",
                source,
            })
    }

    async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("storage pool closed");
    }
}

/// In-process store for dry runs and tests. Writes fail once closed.
#[derive(Debug, Default)]
pub struct MemoryStore {
    posts: Mutex<Vec<Post>>,
    results: Mutex<Vec<SentimentResult>>,
    closed: AtomicBool,
    close_calls: AtomicU32,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn posts(&self) -> Vec<Post> {
        self.posts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn results(&self) -> Vec<SentimentResult> {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn close_calls(&self) -> u32 {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn insert_posts(&self, posts: &[Post]) -> Result<u64, StorageError> {
        if self.is_closed() {
            return Err(StorageError::Closed {
                operation: "insert_posts",
            });
        }
        let mut stored = self.posts.lock().unwrap_or_else(PoisonError::into_inner);
        stored.extend_from_slice(posts);
        Ok(posts.len() as u64)
    }

    async fn insert_sentiment_results(
        &self,
        results: &[SentimentResult],
    ) -> Result<u64, StorageError> {
        if self.is_closed() {
            return Err(StorageError::Closed {
                operation: "insert_sentiment_results",
            });
        }
        let mut stored = self.results.lock().unwrap_or_else(PoisonError::into_inner);
        stored.extend_from_slice(results);
        Ok(results.len() as u64)
    }

    async fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Forward through a shared handle so callers can keep inspecting a store
/// the orchestrator owns.
#[async_trait]
impl<S: PostStore + ?Sized> PostStore for std::sync::Arc<S> {
    async fn insert_posts(&self, posts: &[Post]) -> Result<u64, StorageError> {
        (**self).insert_posts(posts).await
    }

    async fn insert_sentiment_results(
        &self,
        results: &[SentimentResult],
    ) -> Result<u64, StorageError> {
        (**self).insert_sentiment_results(results).await
    }

    async fn close(&self) {
        (**self).close().await;
    }
}
