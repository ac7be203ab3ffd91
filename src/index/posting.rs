use serde::{Deserialize, Serialize};

/// Occurrences of one term in one document
///
/// `positions[i]` and `offsets[i]` describe the i-th occurrence in the order
/// it was added. `term_frequency() == positions().len() == offsets().len()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    positions: Vec<u32>,
    offsets: Vec<u32>,
}

impl Posting {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a posting from stored occurrence lists
    ///
    /// Returns `None` when the two lists differ in length.
    pub fn from_parts(positions: Vec<u32>, offsets: Vec<u32>) -> Option<Self> {
        if positions.len() != offsets.len() {
            return None;
        }
        Some(Self { positions, offsets })
    }

    pub fn add_occurrence(&mut self, position: u32, offset: u32) {
        self.positions.push(position);
        self.offsets.push(offset);
    }

    pub fn term_frequency(&self) -> u32 {
        self.positions.len() as u32
    }

    pub fn positions(&self) -> &[u32] {
        &self.positions
    }

    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    /// (position, offset) pairs in insertion order
    pub fn occurrences(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.positions
            .iter()
            .copied()
            .zip(self.offsets.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_occurrence_keeps_lists_aligned() {
        let mut posting = Posting::new();
        posting.add_occurrence(3, 17);
        posting.add_occurrence(9, 52);

        assert_eq!(posting.term_frequency(), 2);
        assert_eq!(posting.positions(), &[3, 9]);
        assert_eq!(posting.offsets(), &[17, 52]);
        assert_eq!(posting.occurrences().collect::<Vec<_>>(), vec![(3, 17), (9, 52)]);
    }

    #[test]
    fn test_from_parts_rejects_mismatched_lengths() {
        assert!(Posting::from_parts(vec![1, 2], vec![5]).is_none());
        let posting = Posting::from_parts(vec![1], vec![5]).unwrap();
        assert_eq!(posting.term_frequency(), 1);
    }
}
