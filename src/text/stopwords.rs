use super::Token;
use std::collections::HashSet;

/// Removes stop words from a token stream, keeping the remaining tokens in order
pub trait StopWordFilter: Send + Sync {
    fn filter(&self, tokens: Vec<Token>) -> Vec<Token>;
}

/// Common English function words
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "if", "in", "into", "is", "it", "its", "itself", "just", "me",
    "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once", "only",
    "or", "other", "our", "ours", "ourselves", "out", "over", "own", "same", "she", "should", "so",
    "some", "such", "than", "that", "the", "their", "theirs", "them", "themselves", "then",
    "there", "these", "they", "this", "those", "through", "to", "too", "under", "until", "up",
    "very", "was", "we", "were", "what", "when", "where", "which", "while", "who", "whom", "why",
    "will", "with", "would", "you", "your", "yours", "yourself", "yourselves",
];

/// Stop-word filter backed by [`DEFAULT_STOP_WORDS`] plus optional extras
#[derive(Debug, Clone)]
pub struct EnglishStopWords {
    words: HashSet<String>,
}

impl EnglishStopWords {
    pub fn new() -> Self {
        Self::with_extra(&[])
    }

    /// Default list extended with `extra` (compared lower-cased)
    pub fn with_extra(extra: &[String]) -> Self {
        let words = DEFAULT_STOP_WORDS
            .iter()
            .map(|w| w.to_string())
            .chain(extra.iter().map(|w| w.to_ascii_lowercase()))
            .collect();

        Self { words }
    }

    pub fn contains(&self, term: &str) -> bool {
        self.words.contains(term)
    }
}

impl Default for EnglishStopWords {
    fn default() -> Self {
        Self::new()
    }
}

impl StopWordFilter for EnglishStopWords {
    fn filter(&self, tokens: Vec<Token>) -> Vec<Token> {
        tokens
            .into_iter()
            .filter(|token| !self.contains(&token.term))
            .collect()
    }
}
