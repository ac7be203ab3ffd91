use crate::index::{DocId, InvertedIndex};
use std::collections::BTreeSet;

/// Boolean AND retrieval over a single index
pub struct QueryExecutor<'a> {
    index: &'a InvertedIndex,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(index: &'a InvertedIndex) -> Self {
        Self { index }
    }

    /// Documents containing every term
    ///
    /// An empty term list matches nothing. The first term seeds the result
    /// and each following term is intersected into it.
    pub fn execute<S: AsRef<str>>(&self, terms: &[S]) -> BTreeSet<DocId> {
        let mut result: Option<BTreeSet<DocId>> = None;

        for term in terms {
            let postings = self.index.get_postings(term.as_ref());

            result = Some(match result {
                None => postings.keys().copied().collect(),
                Some(mut acc) => {
                    acc.retain(|doc_id| postings.contains_key(doc_id));
                    acc
                }
            });

            if result.as_ref().is_some_and(BTreeSet::is_empty) {
                break;
            }
        }

        result.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{RegexTokenizer, Tokenizer};

    fn index() -> InvertedIndex {
        let tokenizer = RegexTokenizer::new(2).unwrap();
        let mut index = InvertedIndex::new();
        index.add_document(1, &tokenizer.tokenize("rust search engine"));
        index.add_document(2, &tokenizer.tokenize("rust compiler"));
        index.add_document(3, &tokenizer.tokenize("search engine ranking"));
        index
    }

    fn intersection(index: &InvertedIndex, terms: &[&str]) -> BTreeSet<DocId> {
        let mut sets = terms
            .iter()
            .map(|t| index.get_postings(t).keys().copied().collect::<BTreeSet<_>>());
        let first = sets.next().unwrap_or_default();
        sets.fold(first, |acc, s| acc.intersection(&s).copied().collect())
    }

    #[test]
    fn test_empty_terms_match_nothing() {
        let index = index();
        let terms: [&str; 0] = [];
        assert!(QueryExecutor::new(&index).execute(&terms).is_empty());
    }

    #[test]
    fn test_single_term_returns_its_documents() {
        let index = index();
        let hits = QueryExecutor::new(&index).execute(&["rust"]);
        assert_eq!(hits.into_iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_matches_set_intersection_for_any_order() {
        let index = index();
        let executor = QueryExecutor::new(&index);

        let queries: &[&[&str]] = &[
            &["search", "engine"],
            &["engine", "search"],
            &["rust", "engine"],
            &["engine", "rust", "search"],
            &["ranking", "rust"],
            &["compiler"],
        ];

        for terms in queries {
            assert_eq!(
                executor.execute(*terms),
                intersection(&index, terms),
                "{:?}",
                terms
            );
        }
    }

    #[test]
    fn test_unknown_term_empties_result() {
        let index = index();
        let executor = QueryExecutor::new(&index);

        assert!(executor.execute(&["rust", "missing"]).is_empty());
        assert!(executor.execute(&["missing", "rust"]).is_empty());
    }
}
