//! Result deduplication by canonical document id

use crate::retrieval::KeywordResult;
use std::collections::HashSet;

/// Deduplicate keyword results by canonical id, keeping the first instance
///
/// The same canonical document can be live in more than one segment (until a
/// merge removes the copy). Input is expected in ranking order, so the first
/// instance is the best scored one.
pub fn deduplicate_by_canonical(results: Vec<KeywordResult>) -> Vec<KeywordResult> {
    let mut seen: HashSet<i64> = HashSet::new();

    results
        .into_iter()
        .filter(|result| seen.insert(result.canonical_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(canonical_id: i64, score: f64, segment_id: i64) -> KeywordResult {
        KeywordResult {
            canonical_id,
            score,
            title: format!("doc {}", canonical_id),
            url: format!("https://example.com/{}", canonical_id),
            segment_id,
            doc_id: 1,
        }
    }

    #[test]
    fn test_deduplication() {
        let results = vec![
            result(1, 0.9, 1),
            result(2, 0.8, 1),
            result(1, 0.7, 2), // Same document, older segment copy
        ];

        let deduped = deduplicate_by_canonical(results);

        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].canonical_id, 1);
        assert_eq!(deduped[0].score, 0.9); // Keeps first (highest score)
        assert_eq!(deduped[0].segment_id, 1);
    }
}
