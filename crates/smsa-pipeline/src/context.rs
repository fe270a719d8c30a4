//! Owned pipeline context: error counters and the wall clock.
//!
//! One [`PipelineContext`] is created per pipeline and handed to the
//! orchestrator at construction. Nothing here is global; tests swap in a
//! [`ManualClock`] and inspect the tracker directly.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

/// Window used by [`ErrorTracker::recent_default`].
pub const RECENT_ERROR_WINDOW_SECS: i64 = 3_600;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorCategory {
    /// A source fetch attempt failed.
    Fetch,
    /// A source exceeded its fan-out bound.
    Timeout,
    /// The model path failed and the heuristic was used instead.
    Scoring,
    /// A batch write was rejected.
    Storage,
}

impl ErrorCategory {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Fetch => "fetch",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Scoring => "scoring",
            ErrorCategory::Storage => "storage",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
    pub category: ErrorCategory,
    pub component: String,
    pub count: u64,
    pub last_occurred_at: DateTime<Utc>,
    pub last_message: String,
}

/// Per-(category, component) error counters.
#[derive(Debug, Default)]
pub struct ErrorTracker {
    entries: BTreeMap<(ErrorCategory, String), ErrorEntry>,
}

impl ErrorTracker {
    pub fn record(
        &mut self,
        category: ErrorCategory,
        component: &str,
        message: impl Into<String>,
        at: DateTime<Utc>,
    ) {
        let message = message.into();
        self.entries
            .entry((category, component.to_string()))
            .and_modify(|entry| {
                entry.count += 1;
                entry.last_occurred_at = at;
                entry.last_message.clone_from(&message);
            })
            .or_insert_with(|| ErrorEntry {
                category,
                component: component.to_string(),
                count: 1,
                last_occurred_at: at,
                last_message: message.clone(),
            });
    }

    /// Every entry, ordered by category then component.
    #[must_use]
    pub fn summary(&self) -> Vec<ErrorEntry> {
        self.entries.values().cloned().collect()
    }

    /// Entries whose last occurrence is within `window` of `now`.
    #[must_use]
    pub fn recent(&self, now: DateTime<Utc>, window: Duration) -> Vec<ErrorEntry> {
        self.entries
            .values()
            .filter(|entry| now - entry.last_occurred_at < window)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn recent_default(&self, now: DateTime<Utc>) -> Vec<ErrorEntry> {
        self.recent(now, Duration::seconds(RECENT_ERROR_WINDOW_SECS))
    }

    #[must_use]
    pub fn count(&self, category: ErrorCategory, component: &str) -> u64 {
        self.entries
            .get(&(category, component.to_string()))
            .map_or(0, |entry| entry.count)
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.entries.values().map(|entry| entry.count).sum()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }
}

pub struct PipelineContext {
    clock: Arc<dyn Clock>,
    errors: ErrorTracker,
}

impl PipelineContext {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            errors: ErrorTracker::default(),
        }
    }

    #[must_use]
    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Count an error against `component`, stamped with the context clock.
    pub fn record_error(
        &mut self,
        category: ErrorCategory,
        component: &str,
        message: impl Into<String>,
    ) {
        let at = self.clock.now();
        self.errors.record(category, component, message, at);
    }

    #[must_use]
    pub fn errors(&self) -> &ErrorTracker {
        &self.errors
    }

    pub fn reset_errors(&mut self) {
        self.errors.reset();
    }
}

impl fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineContext")
            .field("now", &self.clock.now())
            .field("errors", &self.errors)
            .finish()
    }
}
