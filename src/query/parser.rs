use crate::text::TextProcessor;
use std::sync::Arc;

/// Turns query text into index terms using the document pipeline
#[derive(Clone)]
pub struct QueryParser {
    processor: Arc<TextProcessor>,
}

impl QueryParser {
    pub fn new(processor: Arc<TextProcessor>) -> Self {
        Self { processor }
    }

    /// Query terms in the order they appear, stop words removed
    pub fn parse(&self, query: &str) -> Vec<String> {
        self.processor
            .process(query)
            .into_iter()
            .map(|token| token.term)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TextConfig;

    #[test]
    fn test_parse_normalizes_and_filters() {
        let processor = TextProcessor::from_config(&TextConfig::default()).unwrap();
        let parser = QueryParser::new(Arc::new(processor));

        assert_eq!(
            parser.parse("What is the History of POTATO farming?"),
            vec!["history", "potato", "farming"]
        );
        assert!(parser.parse("the of and").is_empty());
    }
}
