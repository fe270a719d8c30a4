//! Shared domain types and configuration for the social media sentiment pipeline.

mod app_config;
mod config;
mod post;
mod sources;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use post::{
    LabelProbabilities, Platform, Post, ScoreSource, SentimentLabel, SentimentResult,
    SentimentScore, UNKNOWN_AUTHOR,
};
pub use sources::{
    load_sources_config, RedditSourceConfig, SourcesConfig, TwitterSourceConfig,
    YoutubeSourceConfig,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read sources config {path}: {source}")]
    SourcesIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sources config {path}: {source}")]
    SourcesParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid sources config: {0}")]
    InvalidSources(String),
}
