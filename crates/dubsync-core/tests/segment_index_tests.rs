use dubsync_core::{Segment, SegmentIndex};
use proptest::prelude::*;

/// Build non-overlapping segments from (gap, length) pairs laid end to end
fn layout(parts: &[(f64, f64)]) -> Vec<Segment> {
    let mut cursor = 0.0;
    parts
        .iter()
        .enumerate()
        .map(|(i, &(gap, len))| {
            let start = cursor + gap;
            let end = start + len;
            cursor = end;
            Segment::new(format!("seg-{}", i), start, end, format!("src-{}", i))
        })
        .collect()
}

fn linear_lookup(segments: &[Segment], t: f64) -> Option<&Segment> {
    segments.iter().find(|s| s.start <= t && t < s.end)
}

proptest! {
    #[test]
    fn lookup_matches_linear_scan(
        parts in prop::collection::vec((0.0f64..3.0, 0.01f64..4.0), 0..80),
        queries in prop::collection::vec(-5.0f64..400.0, 1..50),
    ) {
        let segments = layout(&parts);
        let mut shuffled = segments.clone();
        shuffled.reverse();
        let index = SegmentIndex::new(shuffled).unwrap();

        for t in queries {
            let expected = linear_lookup(&segments, t).map(|s| s.id.clone());
            let found = index.segment_at(t);
            prop_assert_eq!(found.map(|s| s.id.clone()), expected);
            if let Some(seg) = found {
                prop_assert!(seg.start <= t && t < seg.end);
            }
        }
    }

    #[test]
    fn segment_end_resolves_to_successor_or_none(
        parts in prop::collection::vec((0.0f64..2.0, 0.01f64..4.0), 1..40),
    ) {
        let segments = layout(&parts);
        let index = SegmentIndex::new(segments.clone()).unwrap();

        for (i, seg) in segments.iter().enumerate() {
            let at_end = index.segment_at(seg.end);
            match segments.get(i + 1) {
                Some(next) if next.start == seg.end => {
                    prop_assert_eq!(at_end.map(|s| &s.id), Some(&next.id));
                }
                _ => prop_assert!(at_end.map(|s| &s.id) != Some(&seg.id)),
            }
        }
    }
}

#[test]
fn test_scenario_segments() {
    let index = SegmentIndex::new(vec![
        Segment::new("A", 0.0, 5.0, "a"),
        Segment::new("B", 5.0, 12.0, "b"),
    ])
    .unwrap();

    assert_eq!(index.segment_at(3.0).unwrap().id.as_str(), "A");
    assert_eq!(index.segment_at(7.5).unwrap().id.as_str(), "B");
    assert_eq!(index.end_time(), 12.0);
    assert_eq!(index.len(), 2);
}

#[test]
fn test_large_track_lookup() {
    let segments: Vec<Segment> = (0..10_000)
        .map(|i| {
            let start = i as f64 * 2.0;
            Segment::new(format!("s{}", i), start, start + 1.5, "x")
        })
        .collect();
    let index = SegmentIndex::new(segments).unwrap();

    assert_eq!(index.segment_at(19_999.0).unwrap().id.as_str(), "s9999");
    assert!(index.segment_at(19_999.6).is_none());
    assert!(index.segment_at(1.75).is_none());
    assert_eq!(index.segment_at(2.0).unwrap().id.as_str(), "s1");
}
