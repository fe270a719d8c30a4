use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // Empty strings count as unset for optional credentials.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let positive = |var: &str, value: u64| -> Result<u64, ConfigError> {
        if value == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(value)
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("SMSA_ENV", "development"))?;
    let log_level = or_default("SMSA_LOG_LEVEL", "info");
    let sources_path = PathBuf::from(or_default("SMSA_SOURCES_PATH", "./config/sources.yaml"));

    let cycle_interval_secs = positive(
        "SMSA_CYCLE_INTERVAL_SECS",
        parse_u64("SMSA_CYCLE_INTERVAL_SECS", "30")?,
    )?;
    let fetch_timeout_secs = positive(
        "SMSA_FETCH_TIMEOUT_SECS",
        parse_u64("SMSA_FETCH_TIMEOUT_SECS", "30")?,
    )?;
    let http_timeout_secs = positive(
        "SMSA_HTTP_TIMEOUT_SECS",
        parse_u64("SMSA_HTTP_TIMEOUT_SECS", "20")?,
    )?;
    let max_fetch_attempts = parse_u32("SMSA_MAX_FETCH_ATTEMPTS", "3")?;
    if max_fetch_attempts == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "SMSA_MAX_FETCH_ATTEMPTS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let rate_limit_backoff_secs = parse_u64("SMSA_RATE_LIMIT_BACKOFF_SECS", "60")?;
    let transient_backoff_cap_secs = parse_u64("SMSA_TRANSIENT_BACKOFF_CAP_SECS", "30")?;
    let model_path = optional("SMSA_MODEL_PATH").map(PathBuf::from);
    let retention_days = parse_u32("SMSA_RETENTION_DAYS", "30")?;

    let db_max_connections = parse_u32("SMSA_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("SMSA_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("SMSA_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let twitter_bearer_token = optional("TWITTER_BEARER_TOKEN");
    let reddit_client_id = optional("REDDIT_CLIENT_ID");
    let reddit_client_secret = optional("REDDIT_CLIENT_SECRET");
    let reddit_user_agent = or_default("REDDIT_USER_AGENT", "SentimentAnalysis/1.0");
    let youtube_api_key = optional("YOUTUBE_API_KEY");

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        sources_path,
        cycle_interval_secs,
        fetch_timeout_secs,
        http_timeout_secs,
        max_fetch_attempts,
        rate_limit_backoff_secs,
        transient_backoff_cap_secs,
        model_path,
        retention_days,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        twitter_bearer_token,
        reddit_client_id,
        reddit_client_secret,
        reddit_user_agent,
        youtube_api_key,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SMSA_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}
