//! Reciprocal Rank Fusion algorithm for combining ranked result lists

use std::collections::HashMap;
use thiserror::Error;

/// Default RRF constant
pub const DEFAULT_RRF_K: f64 = 60.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FusionError {
    #[error("Invalid RRF constant {0}: must be a positive finite number")]
    InvalidK(f64),
}

/// Configuration for fusion algorithm
#[derive(Debug, Clone, PartialEq)]
pub struct FusionConfig {
    /// RRF K constant (typically 60)
    pub rrf_k: f64,
}

impl FusionConfig {
    pub fn new(rrf_k: f64) -> Result<Self, FusionError> {
        if !rrf_k.is_finite() || rrf_k <= 0.0 {
            return Err(FusionError::InvalidK(rrf_k));
        }

        Ok(Self { rrf_k })
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self { rrf_k: DEFAULT_RRF_K }
    }
}

/// Apply Reciprocal Rank Fusion to any number of ranked id lists
///
/// RRF formula: score(id) = sum over all rankings of: 1 / (k + rank), with
/// rank 1 for the first entry of each list. An id present in only one list
/// is scored from that list alone.
///
/// Each list must already be ordered best first and hold every id at most
/// once.
///
/// # Returns
/// Fused (id, score) pairs, sorted by score descending and then by id
/// ascending
pub fn reciprocal_rank_fusion(rankings: &[&[i64]], config: &FusionConfig) -> Vec<(i64, f64)> {
    let mut scores: HashMap<i64, f64> = HashMap::new();

    for ranking in rankings {
        for (rank, id) in ranking.iter().enumerate() {
            let rrf_score = 1.0 / (config.rrf_k + (rank as f64) + 1.0);
            *scores.entry(*id).or_insert(0.0) += rrf_score;
        }
    }

    let mut results: Vec<(i64, f64)> = scores.into_iter().collect();
    results.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rrf_basic() {
        let semantic: Vec<i64> = vec![1, 2, 3];
        let keyword: Vec<i64> = vec![2, 1, 4];

        let fused = reciprocal_rank_fusion(
            &[keyword.as_slice(), semantic.as_slice()],
            &FusionConfig::default(),
        );

        assert_eq!(fused.len(), 4);
        // IDs 1 and 2 appear in both lists, should rank higher
        assert_eq!(fused[0].0, 1);
        assert_eq!(fused[1].0, 2);
        assert!(fused[2].1 > 0.0 && fused[3].1 > 0.0);
    }

    #[test]
    fn test_rrf_symmetric_ranks_score_equally() {
        let keyword: Vec<i64> = vec![10, 20];
        let semantic: Vec<i64> = vec![20, 10];

        let fused = reciprocal_rank_fusion(
            &[keyword.as_slice(), semantic.as_slice()],
            &FusionConfig::default(),
        );
        let expected = 1.0 / 61.0 + 1.0 / 62.0;

        assert_eq!(fused.len(), 2);
        for (_, score) in &fused {
            assert!((score - expected).abs() < 1e-12);
        }
        // Equal scores fall back to ascending id
        assert_eq!(fused[0].0, 10);
        assert_eq!(fused[1].0, 20);
    }

    #[test]
    fn test_single_list_contributions() {
        let ranking: Vec<i64> = vec![7, 3];
        let fused = reciprocal_rank_fusion(&[ranking.as_slice()], &FusionConfig::new(1.0).unwrap());
        assert_eq!(fused, vec![(7, 0.5), (3, 1.0 / 3.0)]);
    }

    #[test]
    fn test_empty_rankings() {
        let empty: Vec<i64> = Vec::new();
        let fused = reciprocal_rank_fusion(&[empty.as_slice(), empty.as_slice()], &FusionConfig::default());
        assert!(fused.is_empty());
    }

    #[test]
    fn test_invalid_k() {
        assert_eq!(FusionConfig::new(0.0), Err(FusionError::InvalidK(0.0)));
        assert!(FusionConfig::new(f64::NAN).is_err());
    }
}
