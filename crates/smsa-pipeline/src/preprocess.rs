//! Text cleaning ahead of model vectorisation.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?\S+|www\S+").expect("valid url regex"));
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[@#]\w+").expect("valid mention/hashtag regex"));
static NON_ALPHA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z\s]").expect("valid non-letter regex"));

/// English stopwords removed before vectorisation.
const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "did", "do", "does", "doing", "don", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just",
    "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once",
    "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "s", "same", "she",
    "should", "so", "some", "such", "t", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "you", "your", "yours", "yourself",
    "yourselves",
];

static STOPWORD_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOPWORDS.iter().copied().collect());

/// Lowercase, strip URLs, mentions, hashtags and anything that is not a
/// letter, then collapse whitespace.
#[must_use]
pub fn clean_text(text: &str) -> String {
    let lower = text.to_lowercase();
    let no_urls = URL_RE.replace_all(&lower, "");
    let no_tags = TAG_RE.replace_all(&no_urls, "");
    let letters = NON_ALPHA_RE.replace_all(&no_tags, "");
    letters.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cleaned tokens with stopwords removed.
#[must_use]
pub fn tokens(text: &str) -> Vec<String> {
    clean_text(text)
        .split_whitespace()
        .filter(|token| !STOPWORD_SET.contains(token))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_strips_urls_tags_and_punctuation() {
        let cleaned = clean_text("Loving #RustLang 2024!! see https://example.com/x @ferris ok?");
        assert_eq!(cleaned, "loving see ok");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(clean_text(""), "");
        assert!(tokens("   ").is_empty());
    }

    #[test]
    fn stopwords_are_removed() {
        assert_eq!(
            tokens("This is not the best release of the year"),
            vec!["best", "release", "year"]
        );
    }
}
