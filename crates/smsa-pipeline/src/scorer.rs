//! Lexicon polarity scorer used when no trained model is available.

/// General-purpose word weights in `[-1.0, 1.0]`.
pub(crate) const LEXICON: &[(&str, f64)] = &[
    // Positive
    ("amazing", 0.6),
    ("awesome", 1.0),
    ("beautiful", 0.85),
    ("best", 1.0),
    ("better", 0.5),
    ("brilliant", 0.9),
    ("clean", 0.37),
    ("cool", 0.35),
    ("easy", 0.43),
    ("elegant", 0.6),
    ("enjoy", 0.4),
    ("excellent", 1.0),
    ("excited", 0.38),
    ("exciting", 0.3),
    ("fantastic", 0.4),
    ("fast", 0.2),
    ("favorite", 0.5),
    ("fun", 0.3),
    ("glad", 0.5),
    ("good", 0.7),
    ("great", 0.8),
    ("happy", 0.8),
    ("helpful", 0.5),
    ("impressive", 1.0),
    ("incredible", 0.9),
    ("interesting", 0.5),
    ("like", 0.2),
    ("love", 0.5),
    ("loved", 0.7),
    ("nice", 0.6),
    ("perfect", 1.0),
    ("powerful", 0.3),
    ("recommend", 0.4),
    ("reliable", 0.5),
    ("simple", 0.2),
    ("solid", 0.3),
    ("success", 0.5),
    ("thanks", 0.2),
    ("useful", 0.3),
    ("win", 0.8),
    ("wonderful", 1.0),
    // Negative
    ("angry", -0.5),
    ("annoying", -0.8),
    ("awful", -1.0),
    ("bad", -0.7),
    ("boring", -1.0),
    ("broken", -0.4),
    ("bug", -0.3),
    ("buggy", -0.5),
    ("confusing", -0.4),
    ("crash", -0.5),
    ("difficult", -0.5),
    ("disappointed", -0.75),
    ("disappointing", -0.6),
    ("fail", -0.5),
    ("failed", -0.5),
    ("frustrating", -0.4),
    ("hard", -0.29),
    ("hate", -0.8),
    ("horrible", -1.0),
    ("poor", -0.4),
    ("sad", -0.5),
    ("slow", -0.3),
    ("stupid", -0.8),
    ("terrible", -1.0),
    ("ugly", -0.7),
    ("useless", -0.5),
    ("worse", -0.4),
    ("worst", -1.0),
    ("wrong", -0.5),
];

/// Words that flip and dampen the next weighted word.
const NEGATIONS: &[&str] = &["not", "no", "never", "neither", "nor", "without"];
const NEGATION_FACTOR: f64 = -0.5;

/// Words that amplify the next weighted word.
const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.3),
    ("really", 1.3),
    ("extremely", 1.5),
    ("incredibly", 1.4),
    ("so", 1.2),
    ("super", 1.3),
    ("totally", 1.2),
];

fn word_weight(word: &str) -> Option<f64> {
    LEXICON
        .iter()
        .find(|(lex_word, _)| *lex_word == word)
        .map(|&(_, weight)| weight)
}

fn intensity(word: &str) -> Option<f64> {
    INTENSIFIERS
        .iter()
        .find(|(w, _)| *w == word)
        .map(|&(_, factor)| factor)
}

fn is_negation(word: &str) -> bool {
    NEGATIONS.contains(&word) || word.ends_with("n't")
}

/// Average polarity of the weighted words in `text`, clamped to `[-1.0, 1.0]`.
///
/// A negation flips and halves the next weighted word; an intensifier scales
/// it. Modifiers lapse at the next weighted word. Returns `0.0` for text
/// with no weighted words. Pure: the same text always yields the same value.
#[must_use]
pub fn polarity(text: &str) -> f64 {
    let mut total = 0.0_f64;
    let mut matched = 0u32;
    let mut modifier = 1.0_f64;

    for raw in text.split_whitespace() {
        let word = raw
            .trim_matches(|c: char| !c.is_alphabetic() && c != '\'')
            .to_lowercase();
        if word.is_empty() {
            continue;
        }

        if is_negation(&word) {
            modifier *= NEGATION_FACTOR;
        } else if let Some(factor) = intensity(&word) {
            modifier *= factor;
        } else if let Some(weight) = word_weight(&word) {
            total += (weight * modifier).clamp(-1.0, 1.0);
            matched += 1;
            modifier = 1.0;
        }
    }

    if matched == 0 {
        return 0.0;
    }
    (total / f64::from(matched)).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_unknown_text_score_zero() {
        assert_eq!(polarity(""), 0.0);
        assert_eq!(polarity("   "), 0.0);
        assert_eq!(polarity("the quick brown fox"), 0.0);
    }

    #[test]
    fn positive_and_negative_words() {
        assert!(polarity("this release is great") > 0.1);
        assert!(polarity("the update is terrible") < -0.1);
    }

    #[test]
    fn negation_flips_and_dampens() {
        let plain = polarity("good");
        let negated = polarity("not good");
        assert!(negated < 0.0);
        assert!(negated.abs() < plain.abs());
        assert!(polarity("don't like it") < 0.0);
    }

    #[test]
    fn intensifier_amplifies_but_stays_in_range() {
        assert!(polarity("very good") > polarity("good"));
        assert_eq!(polarity("extremely perfect"), 1.0);
    }

    #[test]
    fn mixed_text_averages() {
        let score = polarity("great docs but awful compile times");
        assert!(score > -1.0 && score < 1.0, "got {score}");
    }

    #[test]
    fn punctuation_is_stripped() {
        assert!(polarity("great!") > 0.0);
        assert!(polarity("(awful)") < 0.0);
    }

    #[test]
    fn scoring_is_repeatable() {
        let text = "Really not bad at all, I love it";
        assert_eq!(polarity(text), polarity(text));
    }
}
