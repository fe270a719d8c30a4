//! Scoring gateway: the one entry point the orchestrator scores through.

use smsa_core::{LabelProbabilities, ScoreSource, SentimentLabel, SentimentScore};

use crate::error::ScoringError;
use crate::model::SentimentModel;
use crate::scorer;

/// Scores text with the trained model when one is loaded, and with the
/// lexicon heuristic otherwise or whenever the model fails.
#[derive(Default)]
pub struct ScoringGateway {
    model: Option<Box<dyn SentimentModel>>,
    released: bool,
}

impl ScoringGateway {
    /// A gateway that only uses the heuristic.
    #[must_use]
    pub fn heuristic() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_model(model: Box<dyn SentimentModel>) -> Self {
        Self {
            model: Some(model),
            released: false,
        }
    }

    #[must_use]
    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Score `text`. Never fails.
    #[must_use]
    pub fn score(&self, text: &str) -> SentimentScore {
        self.score_detailed(text).0
    }

    /// Score `text`, also returning the model error that forced a fallback.
    #[must_use]
    pub fn score_detailed(&self, text: &str) -> (SentimentScore, Option<ScoringError>) {
        let Some(model) = &self.model else {
            if self.released {
                return (heuristic_score(text), Some(ScoringError::Released));
            }
            return (heuristic_score(text), None);
        };

        match model.predict(text) {
            Ok(probabilities) => (model_score(probabilities), None),
            Err(err) => {
                tracing::debug!(error = %err, "model scoring failed, using heuristic");
                (heuristic_score(text), Some(err))
            }
        }
    }

    /// Drop the model. Returns `false` if it was already released.
    pub fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        let had_model = self.model.take().is_some();
        self.released = true;
        tracing::debug!(had_model, "scoring gateway released");
        true
    }
}

/// Lexicon score: label from polarity, confidence is `|polarity|`.
#[must_use]
pub fn heuristic_score(text: &str) -> SentimentScore {
    let polarity = scorer::polarity(text);
    SentimentScore {
        label: SentimentLabel::from_polarity(polarity),
        confidence: polarity.abs().clamp(0.0, 1.0),
        probabilities: None,
        polarity: Some(polarity),
        source: ScoreSource::Heuristic,
    }
}

/// Label is the most probable class; ties resolve toward negative, then
/// neutral.
fn model_score(p: LabelProbabilities) -> SentimentScore {
    let mut label = SentimentLabel::Negative;
    let mut best = p.negative;
    if p.neutral > best {
        label = SentimentLabel::Neutral;
        best = p.neutral;
    }
    if p.positive > best {
        label = SentimentLabel::Positive;
        best = p.positive;
    }
    SentimentScore {
        label,
        confidence: best.clamp(0.0, 1.0),
        probabilities: Some(p),
        polarity: None,
        source: ScoreSource::Model,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingModel;

    impl SentimentModel for FailingModel {
        fn predict(&self, _text: &str) -> Result<LabelProbabilities, ScoringError> {
            Err(ScoringError::NonFinite)
        }
    }

    struct FixedModel(LabelProbabilities);

    impl SentimentModel for FixedModel {
        fn predict(&self, _text: &str) -> Result<LabelProbabilities, ScoringError> {
            Ok(self.0)
        }
    }

    #[test]
    fn heuristic_results_are_bounded_and_labelled() {
        let gateway = ScoringGateway::heuristic();
        for text in ["", "great great great", "awful", "meh", "not bad, really not bad"] {
            let score = gateway.score(text);
            assert!((0.0..=1.0).contains(&score.confidence), "{text}: {score:?}");
            assert_eq!(score.source, ScoreSource::Heuristic);
            assert!(SentimentLabel::ALL.contains(&score.label));
        }
    }

    #[test]
    fn heuristic_path_is_idempotent() {
        let gateway = ScoringGateway::heuristic();
        let text = "The new release is really good but the docs are poor";
        assert_eq!(gateway.score(text), gateway.score(text));
    }

    #[test]
    fn confidence_is_absolute_polarity() {
        let score = heuristic_score("terrible");
        assert_eq!(score.label, SentimentLabel::Negative);
        assert_eq!(Some(score.confidence), score.polarity.map(f64::abs));
    }

    #[test]
    fn model_failure_falls_back_to_heuristic() {
        let gateway = ScoringGateway::with_model(Box::new(FailingModel));
        let (score, err) = gateway.score_detailed("this is great");
        assert_eq!(score.source, ScoreSource::Heuristic);
        assert_eq!(score.label, SentimentLabel::Positive);
        assert!(matches!(err, Some(ScoringError::NonFinite)));
    }

    #[test]
    fn model_path_reports_probabilities() {
        let probabilities = LabelProbabilities {
            negative: 0.1,
            neutral: 0.2,
            positive: 0.7,
        };
        let gateway = ScoringGateway::with_model(Box::new(FixedModel(probabilities)));
        let score = gateway.score("anything at all");
        assert_eq!(score.source, ScoreSource::Model);
        assert_eq!(score.label, SentimentLabel::Positive);
        assert_eq!(score.confidence, 0.7);
        assert_eq!(score.probabilities, Some(probabilities));
    }

    #[test]
    fn release_happens_once() {
        let mut gateway = ScoringGateway::with_model(Box::new(FailingModel));
        assert!(gateway.release());
        assert!(!gateway.release());
        assert!(!gateway.has_model());
        let (score, err) = gateway.score_detailed("still works after release");
        assert_eq!(score.source, ScoreSource::Heuristic);
        assert!(matches!(err, Some(ScoringError::Released)));
    }
}
