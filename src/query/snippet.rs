/// Extracts a short window of text around a term occurrence
#[derive(Debug, Clone)]
pub struct SnippetGenerator {
    context_chars: usize,
}

impl Default for SnippetGenerator {
    fn default() -> Self {
        Self { context_chars: 30 }
    }
}

impl SnippetGenerator {
    pub fn new(context_chars: usize) -> Self {
        Self { context_chars }
    }

    /// Snippet around the occurrence of `term` starting at character `offset`
    ///
    /// The window spans `context_chars` on either side and is then widened to
    /// the nearest space so words are not cut. Offsets outside the content
    /// give an empty snippet.
    pub fn generate(&self, content: &str, offset: usize, term: &str) -> String {
        let chars: Vec<char> = content.chars().collect();
        if offset >= chars.len() {
            return String::new();
        }

        let term_len = term.chars().count();
        let mut start = offset.saturating_sub(self.context_chars);
        let mut end = (offset + term_len + self.context_chars).min(chars.len());

        while start > 0 && chars[start] != ' ' {
            start -= 1;
        }
        while end < chars.len() && chars[end - 1] != ' ' {
            end += 1;
        }

        chars[start..end].iter().collect::<String>().trim().to_string()
    }
}
