//! Retry and back-off policy for source fetches.
//!
//! Errors are classified by a case-insensitive substring match on their
//! message:
//!
//! | Class         | Terms                                                | Wait before next attempt          |
//! |---------------|------------------------------------------------------|-----------------------------------|
//! | `Fatal`       | unauthorized, forbidden, invalid credentials         | none; the sequence ends           |
//! | `RateLimited` | rate limit, too many requests                        | 60 s, doubling after each use     |
//! | `Transient`   | timeout, connection, network, and anything unmatched | current back-off, capped at 30 s  |
//!
//! Attempts are bounded by [`RetryPolicy::max_attempts`]. An exhausted or
//! fatal sequence yields an empty result so the cycle carries on with
//! whatever the other sources delivered.

use std::future::Future;
use std::time::Duration;

use smsa_core::{AppConfig, Platform};

use crate::error::FetchError;

const FATAL_TERMS: &[&str] = &["unauthorized", "forbidden", "invalid credentials"];
const RATE_LIMIT_TERMS: &[&str] = &["rate limit", "too many requests"];
const TRANSIENT_TERMS: &[&str] = &["timeout", "connection", "network"];

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RATE_LIMIT_BACKOFF_SECS: u64 = 60;
const DEFAULT_TRANSIENT_CAP_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    RateLimited,
    Transient,
    Fatal,
}

/// Classify an error message.
///
/// Fatal terms win over everything else so a credential problem is never
/// retried even when the message also mentions the connection.
#[must_use]
pub fn classify(message: &str) -> ErrorClass {
    let lower = message.to_lowercase();
    let mentions = |terms: &[&str]| terms.iter().any(|term| lower.contains(term));

    if mentions(FATAL_TERMS) {
        ErrorClass::Fatal
    } else if mentions(RATE_LIMIT_TERMS) {
        ErrorClass::RateLimited
    } else if mentions(TRANSIENT_TERMS) {
        ErrorClass::Transient
    } else {
        tracing::debug!(error = message, "unclassified fetch error, treating as transient");
        ErrorClass::Transient
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub rate_limit_backoff: Duration,
    pub transient_cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            rate_limit_backoff: Duration::from_secs(DEFAULT_RATE_LIMIT_BACKOFF_SECS),
            transient_cap: Duration::from_secs(DEFAULT_TRANSIENT_CAP_SECS),
        }
    }
}

/// Per-fetch bookkeeping; created at the first attempt and dropped with the
/// fetch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    pub attempts: u32,
    pub backoff: Duration,
    pub last_class: Option<ErrorClass>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    pub retry: bool,
    pub wait: Duration,
}

impl RetryDecision {
    const STOP: Self = Self {
        retry: false,
        wait: Duration::ZERO,
    };
}

impl RetryPolicy {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_attempts: config.max_fetch_attempts,
            rate_limit_backoff: Duration::from_secs(config.rate_limit_backoff_secs),
            transient_cap: Duration::from_secs(config.transient_backoff_cap_secs),
        }
    }

    #[must_use]
    pub fn initial_state(&self) -> RetryState {
        RetryState {
            attempts: 0,
            backoff: self.rate_limit_backoff,
            last_class: None,
        }
    }

    /// Record one failed attempt in `state` and decide whether to try again.
    pub fn decide(&self, state: &mut RetryState, message: &str) -> RetryDecision {
        state.attempts += 1;
        let class = classify(message);
        state.last_class = Some(class);

        if class == ErrorClass::Fatal || state.attempts >= self.max_attempts {
            return RetryDecision::STOP;
        }

        let wait = match class {
            ErrorClass::RateLimited => {
                let wait = state.backoff;
                state.backoff = state.backoff.saturating_mul(2);
                wait
            }
            ErrorClass::Transient | ErrorClass::Fatal => state.backoff.min(self.transient_cap),
        };
        RetryDecision { retry: true, wait }
    }
}

/// What one retried fetch produced.
#[derive(Debug)]
pub struct FetchOutcome<T> {
    /// Empty when every attempt failed.
    pub items: Vec<T>,
    pub attempts: u32,
    /// Every failed attempt, oldest first.
    pub errors: Vec<FetchError>,
    pub waits: Vec<Duration>,
}

impl<T> FetchOutcome<T> {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.errors.len() < usize::try_from(self.attempts).unwrap_or(usize::MAX)
    }
}

/// Run `operation` under `policy`, sleeping between attempts as decided.
///
/// Never fails: after a fatal error or the last allowed attempt the outcome
/// carries no items and the errors that led there.
pub async fn fetch_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    platform: Platform,
    mut operation: F,
) -> FetchOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<T>, FetchError>>,
{
    let mut state = policy.initial_state();
    let mut errors = Vec::new();
    let mut waits = Vec::new();

    loop {
        match operation().await {
            Ok(items) => {
                return FetchOutcome {
                    items,
                    attempts: state.attempts + 1,
                    errors,
                    waits,
                };
            }
            Err(err) => {
                let decision = policy.decide(&mut state, &err.to_string());
                if !decision.retry {
                    tracing::warn!(
                        %platform,
                        attempts = state.attempts,
                        class = ?state.last_class,
                        error = %err,
                        "fetch abandoned, continuing with no results from this source"
                    );
                    errors.push(err);
                    return FetchOutcome {
                        items: Vec::new(),
                        attempts: state.attempts,
                        errors,
                        waits,
                    };
                }

                tracing::warn!(
                    %platform,
                    attempt = state.attempts,
                    max_attempts = policy.max_attempts,
                    wait_secs = decision.wait.as_secs(),
                    class = ?state.last_class,
                    error = %err,
                    "fetch failed, retrying after back-off"
                );
                errors.push(err);
                waits.push(decision.wait);
                tokio::time::sleep(decision.wait).await;
            }
        }
    }
}
