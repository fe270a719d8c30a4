use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub sources_path: PathBuf,
    pub cycle_interval_secs: u64,
    pub fetch_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub max_fetch_attempts: u32,
    pub rate_limit_backoff_secs: u64,
    pub transient_backoff_cap_secs: u64,
    pub model_path: Option<PathBuf>,
    pub retention_days: u32,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub twitter_bearer_token: Option<String>,
    pub reddit_client_id: Option<String>,
    pub reddit_client_secret: Option<String>,
    pub reddit_user_agent: String,
    pub youtube_api_key: Option<String>,
}

fn redact(value: Option<&String>) -> Option<&'static str> {
    value.map(|_| "[redacted]")
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("sources_path", &self.sources_path)
            .field("database_url", &"[redacted]")
            .field("cycle_interval_secs", &self.cycle_interval_secs)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("max_fetch_attempts", &self.max_fetch_attempts)
            .field("rate_limit_backoff_secs", &self.rate_limit_backoff_secs)
            .field(
                "transient_backoff_cap_secs",
                &self.transient_backoff_cap_secs,
            )
            .field("model_path", &self.model_path)
            .field("retention_days", &self.retention_days)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "twitter_bearer_token",
                &redact(self.twitter_bearer_token.as_ref()),
            )
            .field("reddit_client_id", &redact(self.reddit_client_id.as_ref()))
            .field(
                "reddit_client_secret",
                &redact(self.reddit_client_secret.as_ref()),
            )
            .field("reddit_user_agent", &self.reddit_user_agent)
            .field("youtube_api_key", &redact(self.youtube_api_key.as_ref()))
            .finish()
    }
}
