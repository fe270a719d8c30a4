use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwitterSourceConfig {
    pub max_results: usize,
}

impl Default for TwitterSourceConfig {
    fn default() -> Self {
        Self { max_results: 50 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedditSourceConfig {
    pub subreddits: Vec<String>,
    pub limit: usize,
}

impl Default for RedditSourceConfig {
    fn default() -> Self {
        Self {
            subreddits: vec![
                "python".to_string(),
                "MachineLearning".to_string(),
                "artificial".to_string(),
            ],
            limit: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeSourceConfig {
    pub max_results: usize,
}

impl Default for YoutubeSourceConfig {
    fn default() -> Self {
        Self { max_results: 20 }
    }
}

/// Keyword set and per-source settings, loaded from YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub keywords: Vec<String>,
    pub twitter: TwitterSourceConfig,
    pub reddit: RedditSourceConfig,
    pub youtube: YoutubeSourceConfig,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            keywords: vec![
                "python".to_string(),
                "AI".to_string(),
                "machine learning".to_string(),
            ],
            twitter: TwitterSourceConfig::default(),
            reddit: RedditSourceConfig::default(),
            youtube: YoutubeSourceConfig::default(),
        }
    }
}

impl SourcesConfig {
    /// Trim and dedupe the keyword list, preserving the first occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSources`] when no keyword survives.
    pub fn normalize_keywords(keywords: &[String]) -> Result<Vec<String>, ConfigError> {
        let mut seen = HashSet::new();
        let cleaned: Vec<String> = keywords
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .filter(|k| seen.insert(k.to_lowercase()))
            .collect();
        if cleaned.is_empty() {
            return Err(ConfigError::InvalidSources(
                "at least one non-empty keyword is required".to_string(),
            ));
        }
        Ok(cleaned)
    }

    fn validate(mut self) -> Result<Self, ConfigError> {
        self.keywords = Self::normalize_keywords(&self.keywords)?;
        self.reddit.subreddits = self
            .reddit
            .subreddits
            .iter()
            .map(|s| s.trim().trim_start_matches("r/").to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Ok(self)
    }
}

/// Load the sources configuration from a YAML file.
///
/// A missing file yields [`SourcesConfig::default`].
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read, parsed, or
/// fails validation.
pub fn load_sources_config(path: &Path) -> Result<SourcesConfig, ConfigError> {
    if !path.exists() {
        return SourcesConfig::default().validate();
    }
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SourcesIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_sources_config(&content, path)
}

fn parse_sources_config(content: &str, path: &Path) -> Result<SourcesConfig, ConfigError> {
    let config: SourcesConfig =
        serde_yaml::from_str(content).map_err(|e| ConfigError::SourcesParse {
            path: path.display().to_string(),
            source: e,
        })?;
    config.validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<SourcesConfig, ConfigError> {
        parse_sources_config(yaml, Path::new("test.yaml"))
    }

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = load_sources_config(Path::new("/definitely/not/here.yaml")).unwrap();
        assert_eq!(cfg, SourcesConfig::default());
        assert_eq!(cfg.keywords, vec!["python", "AI", "machine learning"]);
        assert_eq!(cfg.twitter.max_results, 50);
        assert_eq!(cfg.reddit.limit, 50);
        assert_eq!(cfg.youtube.max_results, 20);
    }

    #[test]
    fn partial_file_keeps_section_defaults() {
        let cfg = parse("keywords: [rust, tokio]\nreddit:\n  subreddits: [rust]\n").unwrap();
        assert_eq!(cfg.keywords, vec!["rust", "tokio"]);
        assert_eq!(cfg.reddit.subreddits, vec!["rust"]);
        assert_eq!(cfg.reddit.limit, 50);
        assert_eq!(cfg.twitter.max_results, 50);
    }

    #[test]
    fn keywords_are_trimmed_and_deduplicated_in_order() {
        let cfg = parse("keywords: [' rust ', Rust, tokio, '', rust]\n").unwrap();
        assert_eq!(cfg.keywords, vec!["rust", "tokio"]);
    }

    #[test]
    fn empty_keywords_are_rejected() {
        let err = parse("keywords: ['  ']\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSources(_)));
    }

    #[test]
    fn subreddit_prefix_is_stripped() {
        let cfg = parse("reddit:\n  subreddits: ['r/rust', ' programming ']\n").unwrap();
        assert_eq!(cfg.reddit.subreddits, vec!["rust", "programming"]);
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = parse("keywords: [unterminated\n").unwrap_err();
        assert!(matches!(err, ConfigError::SourcesParse { .. }));
    }
}
