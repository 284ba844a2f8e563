use dubsync_media::{SeekKind, SeekThrottler, SimVideoSurface, VideoSurface};
use proptest::prelude::*;
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_millis(100);

fn throttler() -> SeekThrottler {
    SeekThrottler::new(WINDOW, 4.0, 1.0)
}

#[test]
fn test_repeated_target_seeks_once() {
    let mut surface = SimVideoSurface::new(60.0);
    let mut t = throttler();
    let t0 = Instant::now();
    for i in 0..50u64 {
        let now = t0 + Duration::from_millis(i * 37);
        t.poll(now, &mut surface);
        t.request_seek(21.5, false, now, &mut surface);
    }
    t.poll(t0 + Duration::from_secs(10), &mut surface);
    assert_eq!(surface.seeks(), vec![21.5]);
    assert_eq!(t.stats().exact_seeks, 1);
    assert!(t.stats().duplicates > 0);
}

#[test]
fn test_scrub_end_is_exact_after_keyframe_seek() {
    let mut surface = SimVideoSurface::new(60.0);
    let mut t = throttler();
    let t0 = Instant::now();
    let cmd = t.request_seek(40.0, true, t0, &mut surface).unwrap();
    assert_eq!(cmd.kind, SeekKind::Keyframe);
    assert_eq!(cmd.position, 40.0);

    let cmd = t.request_seek(40.6, true, t0 + WINDOW, &mut surface).unwrap();
    assert_eq!(cmd.kind, SeekKind::Exact);
    assert_eq!(cmd.position, 40.6);

    let cmd = t
        .finish_scrub(41.7, t0 + WINDOW + Duration::from_millis(1), &mut surface)
        .unwrap();
    assert_eq!(cmd.kind, SeekKind::Exact);
    assert_eq!(surface.current_time(), 41.7);
}

proptest! {
    #[test]
    fn trailing_edge_applies_latest_target(
        steps in prop::collection::vec((0u64..250, 0.01f64..2.0), 1..60),
    ) {
        let mut surface = SimVideoSurface::new(1000.0);
        let mut t = throttler();
        let t0 = Instant::now();
        let mut now = t0;
        let mut target = 0.0;
        let mut fired_at: Vec<Instant> = Vec::new();

        for (gap_ms, step) in steps {
            now += Duration::from_millis(gap_ms);
            target += step;
            if t.poll(now, &mut surface).is_some() {
                fired_at.push(now);
            }
            if t.request_seek(target, false, now, &mut surface).is_some() {
                fired_at.push(now);
            }
        }
        if let Some(deadline) = t.next_deadline() {
            prop_assert!(deadline > now);
            if t.poll(deadline, &mut surface).is_some() {
                fired_at.push(deadline);
            }
        }

        prop_assert!(!t.has_pending());
        prop_assert!((surface.current_time() - target).abs() < 1e-9);
        for pair in fired_at.windows(2) {
            prop_assert!(pair[1].duration_since(pair[0]) >= WINDOW);
        }
    }
}
