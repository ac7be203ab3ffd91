//! Regex word tokenizer

use super::Token;
use regex::Regex;

/// Turns text into an ordered token stream.
///
/// Implementations must be deterministic. `position` is a dense 0-based
/// counter over emitted terms, `offset` the character index of the term's
/// first character in the original text.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<Token>;
}

/// Tokenizer matching runs of ASCII letters at word boundaries
pub struct RegexTokenizer {
    pattern: Regex,
}

impl RegexTokenizer {
    /// Create a tokenizer that emits words of at least `min_len` letters
    pub fn new(min_len: usize) -> Result<Self, regex::Error> {
        if min_len == 0 {
            return Err(regex::Error::Syntax(
                "minimum term length must be at least 1".to_string(),
            ));
        }

        let pattern = Regex::new(&format!(r"\b[a-zA-Z]{{{},}}\b", min_len))?;
        Ok(Self { pattern })
    }
}

impl Tokenizer for RegexTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();

        // Offsets are in characters; walk forward from the last match so the
        // whole text is only counted once.
        let mut byte_cursor = 0;
        let mut char_cursor = 0u32;

        for (position, m) in self.pattern.find_iter(text).enumerate() {
            char_cursor += text[byte_cursor..m.start()].chars().count() as u32;
            byte_cursor = m.start();

            tokens.push(Token::new(
                m.as_str().to_ascii_lowercase(),
                position as u32,
                char_cursor,
            ));
        }

        tokens
    }
}
