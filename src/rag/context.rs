use crate::retrieval::{CanonicalCatalog, HybridResult};
use serde::Serialize;

/// A document handed to the LLM, numbered as it appears in the context
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Source {
    /// `N` in `[Doc N: ...]`, starting at 1
    pub number: usize,
    pub canonical_id: i64,
    pub title: String,
    pub url: String,
    pub score: f64,
}

/// Context text plus the sources it was built from
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledContext {
    pub text: String,
    pub sources: Vec<Source>,
}

/// Builds a bounded-size textual context from ranked search results
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    max_words_per_doc: usize,
}

impl ContextAssembler {
    pub fn new(max_words_per_doc: usize) -> Self {
        Self { max_words_per_doc }
    }

    /// Render the first `top_k` resolvable results as `[Doc N: title] content`
    /// blocks separated by blank lines
    ///
    /// Results whose canonical document is not in `catalog` are skipped and
    /// do not use up a slot.
    pub fn assemble(
        &self,
        results: &[HybridResult],
        top_k: usize,
        catalog: &CanonicalCatalog,
    ) -> AssembledContext {
        let mut text = String::new();
        let mut sources = Vec::new();

        for result in results {
            if sources.len() >= top_k {
                break;
            }
            let Some(doc) = catalog.get(result.canonical_id) else {
                tracing::debug!("Skipping unknown document {}", result.canonical_id);
                continue;
            };

            let number = sources.len() + 1;
            text.push_str(&format!(
                "[Doc {}: {}] {}\n\n",
                number,
                doc.title,
                truncate_words(&doc.content, self.max_words_per_doc)
            ));

            sources.push(Source {
                number,
                canonical_id: result.canonical_id,
                title: doc.title.clone(),
                url: doc.url.clone(),
                score: result.score,
            });
        }

        AssembledContext { text, sources }
    }
}

/// First `max_words` words joined by single spaces, with `...` appended when
/// anything was cut
fn truncate_words(text: &str, max_words: usize) -> String {
    let mut words = text.split_whitespace();
    let kept: Vec<&str> = words.by_ref().take(max_words).collect();

    if words.next().is_none() {
        text.to_string()
    } else {
        format!("{}...", kept.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::Document;
    use std::collections::BTreeMap;

    fn result(canonical_id: i64, score: f64) -> HybridResult {
        HybridResult {
            canonical_id,
            score,
            title: String::new(),
            url: String::new(),
            location: None,
        }
    }

    fn catalog() -> CanonicalCatalog {
        CanonicalCatalog::new(BTreeMap::from([
            (1, Document::new("https://one", "One", "first document body")),
            (2, Document::new("https://two", "Two", "second")),
            (3, Document::new("https://three", "Three", "third")),
        ]))
    }

    #[test]
    fn test_assemble_numbers_and_skips_unknown() {
        let assembler = ContextAssembler::new(100);
        let results = vec![result(2, 0.9), result(99, 0.8), result(1, 0.7), result(3, 0.6)];

        let context = assembler.assemble(&results, 2, &catalog());

        assert_eq!(
            context.text,
            "[Doc 1: Two] second\n\n[Doc 2: One] first document body\n\n"
        );
        assert_eq!(context.sources.len(), 2);
        assert_eq!(context.sources[0].canonical_id, 2);
        assert_eq!(context.sources[1].number, 2);
        assert_eq!(context.sources[1].url, "https://one");
        assert_eq!(context.sources[1].score, 0.7);
    }

    #[test]
    fn test_long_content_is_truncated() {
        let assembler = ContextAssembler::new(2);
        let context = assembler.assemble(&[result(1, 1.0)], 5, &catalog());
        assert_eq!(context.text, "[Doc 1: One] first document...\n\n");
    }

    #[test]
    fn test_truncate_words() {
        assert_eq!(truncate_words("a b", 2), "a b");
        assert_eq!(truncate_words("a  b c", 2), "a b...");
    }
}
