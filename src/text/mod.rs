//! Text processing: tokenization and stop-word filtering
//!
//! Documents and queries go through the same [`TextProcessor`] so that query
//! terms line up with indexed terms.

mod stopwords;
mod tokenizer;

pub use stopwords::{EnglishStopWords, StopWordFilter, DEFAULT_STOP_WORDS};
pub use tokenizer::{RegexTokenizer, Tokenizer};

use crate::config::TextConfig;
use crate::error::{QuarryError, Result};
use serde::{Deserialize, Serialize};

/// A single term occurrence extracted from source text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    /// Normalized (lower-cased) term
    pub term: String,

    /// 0-based sequence number of the term in the tokenizer's output
    pub position: u32,

    /// Character offset of the term's first character in the source text
    pub offset: u32,
}

impl Token {
    pub fn new(term: impl Into<String>, position: u32, offset: u32) -> Self {
        Self {
            term: term.into(),
            position,
            offset,
        }
    }
}

/// Tokenizer followed by stop-word filtering
pub struct TextProcessor {
    tokenizer: Box<dyn Tokenizer>,
    stop_words: Box<dyn StopWordFilter>,
}

impl TextProcessor {
    /// Create a processor from explicit parts
    pub fn new(tokenizer: Box<dyn Tokenizer>, stop_words: Box<dyn StopWordFilter>) -> Self {
        Self {
            tokenizer,
            stop_words,
        }
    }

    /// Build the regex tokenizer and English stop-word list described by `config`
    pub fn from_config(config: &TextConfig) -> Result<Self> {
        let tokenizer = RegexTokenizer::new(config.min_term_length).map_err(|e| {
            QuarryError::InvalidConfigValue {
                path: "text.min_term_length".to_string(),
                message: e.to_string(),
            }
        })?;
        let stop_words = EnglishStopWords::with_extra(&config.extra_stop_words);

        Ok(Self::new(Box::new(tokenizer), Box::new(stop_words)))
    }

    /// Tokenize `text` and drop stop words, preserving token order
    pub fn process(&self, text: &str) -> Vec<Token> {
        let tokens = self.tokenizer.tokenize(text);
        self.stop_words.filter(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_drops_stop_words_keeps_positions() {
        let processor = TextProcessor::from_config(&TextConfig::default()).unwrap();
        let tokens = processor.process("The quick fox and the lazy dog");

        let terms: Vec<&str> = tokens.iter().map(|t| t.term.as_str()).collect();
        assert_eq!(terms, vec!["quick", "fox", "lazy", "dog"]);

        // Positions come from the tokenizer, so filtered words leave gaps
        let positions: Vec<u32> = tokens.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![1, 2, 5, 6]);
    }

    #[test]
    fn test_extra_stop_words() {
        let config = TextConfig {
            extra_stop_words: vec!["fox".to_string()],
            ..TextConfig::default()
        };
        let processor = TextProcessor::from_config(&config).unwrap();
        let tokens = processor.process("quick fox");

        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].term, "quick");
    }

    #[test]
    fn test_invalid_min_term_length() {
        let config = TextConfig {
            min_term_length: 0,
            ..TextConfig::default()
        };
        assert!(TextProcessor::from_config(&config).is_err());
    }
}
