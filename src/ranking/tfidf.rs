use super::Ranker;
use crate::index::{DocId, InvertedIndex};
use std::collections::HashMap;

/// Smoothed TF-IDF
///
/// `idf = ln((N + 1) / (df + 1)) + 1`, contribution `tf * idf`, summed over
/// query terms.
#[derive(Debug, Clone, Copy, Default)]
pub struct TfIdfRanker;

impl TfIdfRanker {
    pub fn idf(total_docs: usize, document_frequency: usize) -> f64 {
        ((total_docs as f64 + 1.0) / (document_frequency as f64 + 1.0)).ln() + 1.0
    }
}

impl Ranker for TfIdfRanker {
    fn rank(
        &self,
        terms: &[String],
        index: &InvertedIndex,
        total_docs: usize,
    ) -> HashMap<DocId, f64> {
        let mut scores: HashMap<DocId, f64> = HashMap::new();

        for term in terms {
            let postings = index.get_postings(term);
            if postings.is_empty() {
                continue;
            }

            let idf = Self::idf(total_docs, postings.len());
            for (&doc_id, posting) in postings {
                *scores.entry(doc_id).or_insert(0.0) += posting.term_frequency() as f64 * idf;
            }
        }

        scores
    }

    fn name(&self) -> &'static str {
        "tfidf"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{RegexTokenizer, Tokenizer};

    fn index(docs: &[&str]) -> InvertedIndex {
        let tokenizer = RegexTokenizer::new(2).unwrap();
        let mut index = InvertedIndex::new();
        for (i, text) in docs.iter().enumerate() {
            index.add_document(i as DocId + 1, &tokenizer.tokenize(text));
        }
        index
    }

    fn terms(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_single_document_single_occurrence_scores_one() {
        let index = index(&["potato"]);
        let scores = TfIdfRanker.rank(&terms(&["potato"]), &index, 1);

        assert_eq!(scores.len(), 1);
        assert!((scores[&1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_term_frequency_scales_score() {
        let index = index(&["potato potato potato", "potato", "carrot"]);
        let scores = TfIdfRanker.rank(&terms(&["potato"]), &index, 3);

        let idf = TfIdfRanker::idf(3, 2);
        assert!((scores[&1] - 3.0 * idf).abs() < 1e-12);
        assert!((scores[&2] - idf).abs() < 1e-12);
        assert!(!scores.contains_key(&3));
    }

    #[test]
    fn test_scores_accumulate_across_terms() {
        let index = index(&["rust search", "rust", "search"]);
        let scores = TfIdfRanker.rank(&terms(&["rust", "search"]), &index, 3);

        let idf = TfIdfRanker::idf(3, 2);
        assert!((scores[&1] - 2.0 * idf).abs() < 1e-12);
        assert!(scores[&1] > scores[&2]);
        assert!((scores[&2] - scores[&3]).abs() < 1e-12);
    }

    #[test]
    fn test_idf_is_positive_for_common_terms() {
        assert!(TfIdfRanker::idf(10, 10) > 0.0);
        assert!((TfIdfRanker::idf(10, 10) - 1.0).abs() < 1e-12);
        assert!(TfIdfRanker::idf(10, 1) > TfIdfRanker::idf(10, 9));
    }

    #[test]
    fn test_unknown_terms_yield_no_scores() {
        let index = index(&["potato"]);
        assert!(TfIdfRanker.rank(&terms(&["turnip"]), &index, 1).is_empty());
        assert!(TfIdfRanker.rank(&[], &index, 1).is_empty());
    }
}
