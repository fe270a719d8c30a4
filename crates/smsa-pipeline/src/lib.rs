//! Collection and sentiment scoring pipeline.
//!
//! On a fixed interval, fans out to the Twitter, Reddit and YouTube adapters,
//! normalizes and deduplicates what they return, scores each post through the
//! scoring gateway (trained model with a lexicon fallback), and appends raw
//! posts and sentiment results to storage. Every per-item and per-source
//! failure is absorbed and counted; only a storage failure at startup is fatal.

pub mod context;
pub mod error;
pub mod gateway;
pub mod model;
pub mod normalize;
pub mod orchestrator;
pub mod retry;
pub mod scheduler;
pub mod scorer;
pub mod setup;
pub mod sources;
pub mod stats;
pub mod storage;

mod preprocess;

pub use context::{Clock, ErrorCategory, ErrorTracker, ManualClock, PipelineContext, SystemClock};
pub use error::{FetchError, ScoringError, StartupError, StorageError};
pub use gateway::ScoringGateway;
pub use orchestrator::{CycleOrchestrator, CycleStage, OrchestratorConfig};
pub use retry::{classify, ErrorClass, RetryPolicy};
pub use scheduler::{Scheduler, SchedulerHandle, SchedulerState};
pub use sources::{SourceAdapter, SourcePayload};
pub use stats::CycleStats;
pub use storage::{MemoryStore, PgStore, PostStore};
