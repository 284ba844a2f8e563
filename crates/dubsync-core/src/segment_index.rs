//! Segment Index - sorted lookup of the segment under the playhead
//!
//! The index is immutable once built. Editing a track produces a new index, which keeps
//! per-frame lookups lock-free and O(log n) even on tracks with thousands of segments.

use crate::segment::{Segment, SegmentId, TimePoint};
use crate::{CoreError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Immutable, start-sorted view over the segments of one track
#[derive(Debug, Clone)]
pub struct SegmentIndex {
    segments: Arc<[Segment]>,
    positions: HashMap<SegmentId, usize>,
}

impl Default for SegmentIndex {
    fn default() -> Self {
        Self {
            segments: Arc::from(Vec::new()),
            positions: HashMap::new(),
        }
    }
}

impl SegmentIndex {
    /// Build an index from segments in any order.
    ///
    /// Fails if a segment is not a finite `start < end` interval, if its playback rate
    /// is not finite and positive, if two segments overlap, or if an id appears twice.
    pub fn new(mut segments: Vec<Segment>) -> Result<Self> {
        for seg in &segments {
            if !seg.is_well_formed() {
                return Err(CoreError::InvalidSegment {
                    id: seg.id.clone(),
                    start: seg.start,
                    end: seg.end,
                });
            }
            if !(seg.playback_rate.is_finite() && seg.playback_rate > 0.0) {
                return Err(CoreError::InvalidSegmentRate {
                    id: seg.id.clone(),
                    rate: seg.playback_rate,
                });
            }
        }

        segments.sort_by(|a, b| a.start.total_cmp(&b.start));

        for pair in segments.windows(2) {
            if pair[1].start < pair[0].end {
                return Err(CoreError::OverlappingSegments {
                    first: pair[0].id.clone(),
                    second: pair[1].id.clone(),
                });
            }
        }

        let mut positions = HashMap::with_capacity(segments.len());
        for (idx, seg) in segments.iter().enumerate() {
            if positions.insert(seg.id.clone(), idx).is_some() {
                return Err(CoreError::DuplicateSegment(seg.id.clone()));
            }
        }

        Ok(Self {
            segments: segments.into(),
            positions,
        })
    }

    /// Find the segment with `start <= time < end`.
    ///
    /// Returns `None` before the first segment, in gaps, past the last segment,
    /// and for NaN. A time equal to a segment's end belongs to the next segment.
    pub fn segment_at(&self, time: TimePoint) -> Option<&Segment> {
        // Number of segments starting at or before `time`
        let idx = self.segments.partition_point(|s| s.start <= time);
        if idx == 0 {
            return None;
        }
        let candidate = &self.segments[idx - 1];
        (time < candidate.end).then_some(candidate)
    }

    /// First segment starting strictly after `time`
    pub fn next_after(&self, time: TimePoint) -> Option<&Segment> {
        let idx = self.segments.partition_point(|s| s.start <= time);
        self.segments.get(idx)
    }

    /// Look up a segment by id
    pub fn get(&self, id: &SegmentId) -> Option<&Segment> {
        self.positions.get(id).map(|&idx| &self.segments[idx])
    }

    /// Sorted position of a segment
    pub fn position_of(&self, id: &SegmentId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    /// End of the last segment, or 0.0 for an empty index
    pub fn end_time(&self) -> TimePoint {
        self.segments.last().map(|s| s.end).unwrap_or(0.0)
    }

    /// Segments in start order
    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the track has no segments
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_segments() -> SegmentIndex {
        SegmentIndex::new(vec![
            Segment::new("B", 5.0, 12.0, "b"),
            Segment::new("A", 0.0, 5.0, "a"),
        ])
        .unwrap()
    }

    #[test]
    fn test_sorts_on_construction() {
        let index = two_segments();
        let ids: Vec<_> = index.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(index.position_of(&"B".into()), Some(1));
    }

    #[test]
    fn test_boundary_belongs_to_next_segment() {
        let index = two_segments();
        assert_eq!(index.segment_at(5.0).unwrap().id.as_str(), "B");
        assert_eq!(index.segment_at(4.999).unwrap().id.as_str(), "A");
        assert!(index.segment_at(12.0).is_none());
    }

    #[test]
    fn test_gaps_and_out_of_range() {
        let index = SegmentIndex::new(vec![
            Segment::new("A", 1.0, 2.0, "a"),
            Segment::new("B", 3.0, 4.0, "b"),
        ])
        .unwrap();
        assert!(index.segment_at(0.5).is_none());
        assert!(index.segment_at(2.5).is_none());
        assert!(index.segment_at(10.0).is_none());
        assert!(index.segment_at(f64::NAN).is_none());
        assert_eq!(index.next_after(2.5).unwrap().id.as_str(), "B");
        assert!(index.next_after(3.0).is_none());
    }

    #[test]
    fn test_rejects_overlap() {
        let err = SegmentIndex::new(vec![
            Segment::new("A", 0.0, 5.0, "a"),
            Segment::new("B", 4.0, 6.0, "b"),
        ])
        .unwrap_err();
        assert!(matches!(err, CoreError::OverlappingSegments { .. }));
    }

    #[test]
    fn test_rejects_inverted_and_duplicate() {
        let err = SegmentIndex::new(vec![Segment::new("A", 3.0, 1.0, "a")]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidSegment { .. }));

        let err = SegmentIndex::new(vec![
            Segment::new("A", 0.0, 1.0, "a"),
            Segment::new("A", 2.0, 3.0, "a2"),
        ])
        .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateSegment(_)));
    }

    #[test]
    fn test_rejects_unplayable_rates() {
        for rate in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = SegmentIndex::new(vec![
                Segment::new("A", 0.0, 5.0, "a"),
                Segment::new("B", 5.0, 8.0, "b").with_rate(rate),
            ])
            .unwrap_err();
            assert!(
                matches!(err, CoreError::InvalidSegmentRate { ref id, .. } if id.as_str() == "B"),
                "rate {} accepted",
                rate
            );
        }
        assert!(SegmentIndex::new(vec![Segment::new("A", 0.0, 5.0, "a").with_rate(0.5)]).is_ok());
    }

    #[test]
    fn test_empty_index() {
        let index = SegmentIndex::default();
        assert!(index.is_empty());
        assert!(index.segment_at(0.0).is_none());
        assert_eq!(index.end_time(), 0.0);
    }
}
