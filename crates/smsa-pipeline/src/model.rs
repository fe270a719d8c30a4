//! Trained linear sentiment model loaded from a JSON artifact.
//!
//! The artifact is produced offline. It holds one weight triple per feature
//! (`negative`, `neutral`, `positive`) plus a bias triple:
//!
//! ```json
//! {
//!   "max_ngram": 2,
//!   "bias": [0.1, 0.3, -0.2],
//!   "weights": { "great": [-1.2, -0.3, 1.8], "slow build": [0.9, 0.1, -1.1] }
//! }
//! ```
//!
//! Features are term counts over preprocessed unigrams (and bigrams when
//! `max_ngram` is 2), L2-normalised. Class probabilities are the softmax of
//! the linear scores.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use smsa_core::LabelProbabilities;

use crate::error::ScoringError;
use crate::preprocess;

/// A scorer that turns text into per-label probabilities.
pub trait SentimentModel: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ScoringError`] when the model cannot produce a valid
    /// distribution for `text`.
    fn predict(&self, text: &str) -> Result<LabelProbabilities, ScoringError>;
}

#[derive(Debug, Deserialize)]
struct Artifact {
    #[serde(default = "default_max_ngram")]
    max_ngram: usize,
    bias: [f64; 3],
    weights: HashMap<String, [f64; 3]>,
}

fn default_max_ngram() -> usize {
    1
}

#[derive(Debug)]
pub struct LinearModel {
    max_ngram: usize,
    bias: [f64; 3],
    weights: HashMap<String, [f64; 3]>,
}

impl LinearModel {
    /// Load and validate an artifact from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::ArtifactIo`] if the file cannot be read,
    /// [`ScoringError::ArtifactParse`] if it is not valid JSON of the expected
    /// shape, or [`ScoringError::InvalidArtifact`] if it fails validation.
    pub fn from_path(path: &Path) -> Result<Self, ScoringError> {
        let content = std::fs::read_to_string(path).map_err(|e| ScoringError::ArtifactIo {
            path: path.display().to_string(),
            source: e,
        })?;
        let artifact: Artifact =
            serde_json::from_str(&content).map_err(|e| ScoringError::ArtifactParse {
                path: path.display().to_string(),
                source: e,
            })?;
        Self::from_artifact(artifact)
    }

    /// Parse an artifact already in memory.
    ///
    /// # Errors
    ///
    /// Same as [`LinearModel::from_path`], minus the I/O case.
    pub fn from_json(json: &str) -> Result<Self, ScoringError> {
        let artifact: Artifact =
            serde_json::from_str(json).map_err(|e| ScoringError::ArtifactParse {
                path: "<inline>".to_string(),
                source: e,
            })?;
        Self::from_artifact(artifact)
    }

    fn from_artifact(artifact: Artifact) -> Result<Self, ScoringError> {
        if !(1..=2).contains(&artifact.max_ngram) {
            return Err(ScoringError::InvalidArtifact(format!(
                "max_ngram must be 1 or 2, got {}",
                artifact.max_ngram
            )));
        }
        if artifact.weights.is_empty() {
            return Err(ScoringError::InvalidArtifact(
                "artifact has no feature weights".to_string(),
            ));
        }
        let all_finite = artifact.bias.iter().all(|b| b.is_finite())
            && artifact
                .weights
                .values()
                .all(|triple| triple.iter().all(|w| w.is_finite()));
        if !all_finite {
            return Err(ScoringError::InvalidArtifact(
                "artifact contains non-finite weights".to_string(),
            ));
        }

        tracing::info!(
            features = artifact.weights.len(),
            max_ngram = artifact.max_ngram,
            "loaded sentiment model artifact"
        );
        Ok(Self {
            max_ngram: artifact.max_ngram,
            bias: artifact.bias,
            weights: artifact.weights,
        })
    }

    fn features(&self, text: &str) -> HashMap<String, f64> {
        let tokens = preprocess::tokens(text);
        let mut counts: HashMap<String, f64> = HashMap::new();
        for token in &tokens {
            *counts.entry(token.clone()).or_default() += 1.0;
        }
        if self.max_ngram >= 2 {
            for pair in tokens.windows(2) {
                *counts.entry(format!("{} {}", pair[0], pair[1])).or_default() += 1.0;
            }
        }

        let norm = counts.values().map(|c| c * c).sum::<f64>().sqrt();
        if norm > 0.0 {
            for value in counts.values_mut() {
                *value /= norm;
            }
        }
        counts
    }
}

fn softmax(scores: [f64; 3]) -> [f64; 3] {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps = scores.map(|s| (s - max).exp());
    let sum: f64 = exps.iter().sum();
    exps.map(|e| e / sum)
}

impl SentimentModel for LinearModel {
    fn predict(&self, text: &str) -> Result<LabelProbabilities, ScoringError> {
        let mut scores = self.bias;
        for (feature, value) in self.features(text) {
            if let Some(weights) = self.weights.get(&feature) {
                for (score, weight) in scores.iter_mut().zip(weights) {
                    *score += weight * value;
                }
            }
        }

        let [negative, neutral, positive] = softmax(scores);
        if ![negative, neutral, positive].iter().all(|p| p.is_finite()) {
            return Err(ScoringError::NonFinite);
        }
        Ok(LabelProbabilities {
            negative,
            neutral,
            positive,
        })
    }
}
