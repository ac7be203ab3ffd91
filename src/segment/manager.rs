use super::{Segment, SegmentId};
use crate::error::{QuarryError, Result};

/// Owns the set of live (searchable) segments
///
/// Segments are kept in insertion order. Membership only changes through
/// [`SegmentManager::add_segment`], [`SegmentManager::replace`] and
/// [`SegmentManager::clear`]; a merge result never becomes visible until the
/// caller swaps it in.
#[derive(Debug, Default)]
pub struct SegmentManager {
    segments: Vec<Segment>,
}

impl SegmentManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a segment to the live set
    pub fn add_segment(&mut self, segment: Segment) -> Result<()> {
        if self.contains(segment.id()) {
            return Err(QuarryError::DuplicateSegment { id: segment.id() });
        }

        tracing::debug!(
            "Segment {} is live ({} documents)",
            segment.id(),
            segment.len()
        );
        self.segments.push(segment);
        Ok(())
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn contains(&self, id: SegmentId) -> bool {
        self.segments.iter().any(|s| s.id() == id)
    }

    /// Look up a live segment
    pub fn get_segment(&self, id: SegmentId) -> Result<&Segment> {
        self.segments
            .iter()
            .find(|s| s.id() == id)
            .ok_or(QuarryError::SegmentNotFound { id })
    }

    /// Swap two live segments for their merge result in one step
    ///
    /// Nothing changes unless both sources are live and the replacement id
    /// is not.
    pub fn replace(&mut self, a: SegmentId, b: SegmentId, merged: Segment) -> Result<()> {
        self.get_segment(a)?;
        self.get_segment(b)?;
        if self.contains(merged.id()) {
            return Err(QuarryError::DuplicateSegment { id: merged.id() });
        }

        self.segments.retain(|s| s.id() != a && s.id() != b);
        tracing::info!(
            "Segments {} + {} replaced by segment {} ({} documents)",
            a,
            b,
            merged.id(),
            merged.len()
        );
        self.segments.push(merged);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total documents across live segments (duplicates counted per segment)
    pub fn document_count(&self) -> usize {
        self.segments.iter().map(Segment::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_segment_rejected() {
        let mut manager = SegmentManager::new();
        manager.add_segment(Segment::new(1)).unwrap();

        let err = manager.add_segment(Segment::new(1)).unwrap_err();
        assert!(matches!(err, QuarryError::DuplicateSegment { id: 1 }));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_get_missing_segment() {
        let manager = SegmentManager::new();
        let err = manager.get_segment(9).unwrap_err();
        assert!(matches!(err, QuarryError::SegmentNotFound { id: 9 }));
    }

    #[test]
    fn test_replace_swaps_sources_for_result() {
        let mut manager = SegmentManager::new();
        manager.add_segment(Segment::new(1)).unwrap();
        manager.add_segment(Segment::new(2)).unwrap();
        manager.add_segment(Segment::new(3)).unwrap();

        manager.replace(1, 3, Segment::new(4)).unwrap();

        let ids: Vec<SegmentId> = manager.segments().iter().map(Segment::id).collect();
        assert_eq!(ids, vec![2, 4]);
    }

    #[test]
    fn test_replace_is_all_or_nothing() {
        let mut manager = SegmentManager::new();
        manager.add_segment(Segment::new(1)).unwrap();

        assert!(manager.replace(1, 2, Segment::new(5)).is_err());
        assert!(manager.contains(1));
        assert!(!manager.contains(5));
    }
}
