use smsa_core::Platform;
use thiserror::Error;

/// Longest slice of an error response body carried into a [`FetchError`].
const BODY_SNIPPET_CHARS: usize = 200;

/// A failed fetch from one source.
///
/// The `Display` text is what the retry policy classifies, so each variant
/// names its condition with the terms the classifier looks for.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{platform}: rate limit exceeded (too many requests)")]
    RateLimited { platform: Platform },

    #[error("{platform}: unauthorized: {detail}")]
    Unauthorized { platform: Platform, detail: String },

    #[error("{platform}: forbidden: {detail}")]
    Forbidden { platform: Platform, detail: String },

    #[error("{platform}: request timeout")]
    Timeout { platform: Platform },

    #[error("{platform}: connection failed: {detail}")]
    Connection { platform: Platform, detail: String },

    #[error("{platform}: network error: {detail}")]
    Network { platform: Platform, detail: String },

    #[error("{platform}: unexpected HTTP status {status}: {detail}")]
    UnexpectedStatus {
        platform: Platform,
        status: u16,
        detail: String,
    },

    #[error("{platform}: malformed response: {detail}")]
    Parse { platform: Platform, detail: String },

    #[error("{platform}: invalid credentials: {what} not configured")]
    NotConfigured {
        platform: Platform,
        what: &'static str,
    },
}

impl FetchError {
    #[must_use]
    pub fn platform(&self) -> Platform {
        match self {
            FetchError::RateLimited { platform }
            | FetchError::Unauthorized { platform, .. }
            | FetchError::Forbidden { platform, .. }
            | FetchError::Timeout { platform }
            | FetchError::Connection { platform, .. }
            | FetchError::Network { platform, .. }
            | FetchError::UnexpectedStatus { platform, .. }
            | FetchError::Parse { platform, .. }
            | FetchError::NotConfigured { platform, .. } => *platform,
        }
    }

    /// Map a transport-level `reqwest` failure.
    ///
    /// The request URL is stripped first; some sources carry their API key in
    /// the query string.
    #[must_use]
    pub fn from_reqwest(platform: Platform, err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_timeout() {
            FetchError::Timeout { platform }
        } else if err.is_connect() {
            FetchError::Connection {
                platform,
                detail: err.to_string(),
            }
        } else if err.is_decode() {
            FetchError::Parse {
                platform,
                detail: err.to_string(),
            }
        } else {
            FetchError::Network {
                platform,
                detail: err.to_string(),
            }
        }
    }

    /// Map a non-success HTTP status and its (possibly empty) body.
    #[must_use]
    pub fn from_status(platform: Platform, status: u16, body: &str) -> Self {
        let detail: String = body.trim().chars().take(BODY_SNIPPET_CHARS).collect();
        match status {
            429 => FetchError::RateLimited { platform },
            401 => FetchError::Unauthorized { platform, detail },
            403 => FetchError::Forbidden { platform, detail },
            _ => FetchError::UnexpectedStatus {
                platform,
                status,
                detail,
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("failed to read model artifact {path}: {source}")]
    ArtifactIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse model artifact {path}: {source}")]
    ArtifactParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid model artifact: {0}")]
    InvalidArtifact(String),

    #[error("model produced non-finite probabilities")]
    NonFinite,

    #[error("scoring model has been released")]
    Released,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{operation} failed: {source}")]
    Database {
        operation: &'static str,
        #[source]
        source: smsa_db::DbError,
    },

    #[error("{operation} failed: store is closed")]
    Closed { operation: &'static str },
}

/// Conditions that abort pipeline construction.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to connect to storage: {0}")]
    Storage(#[source] smsa_db::DbError),

    #[error("failed to build {platform} HTTP client: {source}")]
    HttpClient {
        platform: Platform,
        #[source]
        source: reqwest::Error,
    },
}
