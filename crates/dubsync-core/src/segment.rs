//! Segment model
//!
//! A segment is a bounded interval on an audio track with its own audio source and
//! playback rate. Containment is half-open: `start <= t < end`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Time in seconds
pub type TimePoint = f64;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an id from any string-like value
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw id
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Stable identity of a segment; survives audio regeneration
    SegmentId
);

string_id!(
    /// Identity of an audio track (lane) on the timeline
    TrackId
);

string_id!(
    /// Opaque reference to the audio backing a segment.
    ///
    /// Only compared for equality: a change means the audio was regenerated.
    AudioSourceRef
);

/// A bounded interval on a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Segment id
    pub id: SegmentId,
    /// Start time in seconds (inclusive)
    pub start: TimePoint,
    /// End time in seconds (exclusive)
    pub end: TimePoint,
    /// Playback rate applied to this segment's audio
    #[serde(default = "default_rate")]
    pub playback_rate: f64,
    /// Current audio source
    pub audio_source: AudioSourceRef,
}

fn default_rate() -> f64 {
    1.0
}

impl Segment {
    /// Create a segment with a playback rate of 1.0
    pub fn new(
        id: impl Into<SegmentId>,
        start: TimePoint,
        end: TimePoint,
        audio_source: impl Into<AudioSourceRef>,
    ) -> Self {
        Self {
            id: id.into(),
            start,
            end,
            playback_rate: 1.0,
            audio_source: audio_source.into(),
        }
    }

    /// Builder-style playback rate override
    pub fn with_rate(mut self, playback_rate: f64) -> Self {
        self.playback_rate = playback_rate;
        self
    }

    /// Length of the segment in seconds
    pub fn duration(&self) -> TimePoint {
        self.end - self.start
    }

    /// Half-open containment test
    pub fn contains(&self, time: TimePoint) -> bool {
        self.start <= time && time < self.end
    }

    /// Offset of `time` relative to the segment start
    pub fn offset_of(&self, time: TimePoint) -> TimePoint {
        time - self.start
    }

    /// Whether the bounds form a valid, finite half-open interval
    pub fn is_well_formed(&self) -> bool {
        self.start.is_finite() && self.end.is_finite() && self.start < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_open_containment() {
        let seg = Segment::new("a", 0.0, 5.0, "src-a");
        assert!(seg.contains(0.0));
        assert!(seg.contains(4.999));
        assert!(!seg.contains(5.0));
        assert!(!seg.contains(-0.001));
    }

    #[test]
    fn test_offset_and_duration() {
        let seg = Segment::new("b", 5.0, 12.0, "src-b").with_rate(1.25);
        assert_eq!(seg.duration(), 7.0);
        assert_eq!(seg.offset_of(7.5), 2.5);
        assert_eq!(seg.playback_rate, 1.25);
    }

    #[test]
    fn test_well_formed() {
        assert!(Segment::new("a", 1.0, 2.0, "s").is_well_formed());
        assert!(!Segment::new("a", 2.0, 2.0, "s").is_well_formed());
        assert!(!Segment::new("a", f64::NAN, 2.0, "s").is_well_formed());
    }

    #[test]
    fn test_segment_rate_defaults_when_missing() {
        let json = r#"{"id":"s1","start":0.0,"end":1.5,"audio_source":"tts://1"}"#;
        let seg: Segment = serde_json::from_str(json).unwrap();
        assert_eq!(seg.playback_rate, 1.0);
        assert_eq!(seg.id.as_str(), "s1");
        assert_eq!(seg.audio_source, AudioSourceRef::new("tts://1"));
    }
}
