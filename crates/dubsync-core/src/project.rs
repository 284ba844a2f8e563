//! Session project description
//!
//! The timeline as handed to the engine by the surrounding editor: one video surface
//! spanning `duration` and any number of segmented audio tracks.

use crate::segment::{Segment, TimePoint, TrackId};
use crate::segment_index::SegmentIndex;
use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Segments of one audio track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSegments {
    /// Track id
    pub id: TrackId,
    /// Segments, in any order
    #[serde(default)]
    pub segments: Vec<Segment>,
}

/// Timeline of one editing session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionProject {
    /// Session name
    #[serde(default = "default_name")]
    pub name: String,
    /// Duration of the video surface in seconds
    pub duration: TimePoint,
    /// Audio tracks
    #[serde(default)]
    pub tracks: Vec<TrackSegments>,
}

fn default_name() -> String {
    "Untitled Session".to_string()
}

impl SessionProject {
    /// Create an empty project
    pub fn new(name: impl Into<String>, duration: TimePoint) -> Self {
        Self {
            name: name.into(),
            duration,
            tracks: Vec::new(),
        }
    }

    /// Parse a JSON project and validate it
    pub fn from_json_str(text: &str) -> Result<Self> {
        let project: Self = serde_json::from_str(text)?;
        project.validate()?;
        Ok(project)
    }

    /// Load a JSON project file and validate it
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Check the duration and every track's segment geometry
    pub fn validate(&self) -> Result<()> {
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(CoreError::InvalidDuration(self.duration));
        }
        for track in &self.tracks {
            SegmentIndex::new(track.segments.clone())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &str = r#"{
        "name": "Episode 3",
        "duration": 60.0,
        "tracks": [
            { "id": "dub-fr", "segments": [
                { "id": "A", "start": 0.0, "end": 5.0, "audio_source": "tts://a/1" },
                { "id": "B", "start": 5.0, "end": 12.0, "playback_rate": 1.1, "audio_source": "tts://b/1" }
            ]}
        ]
    }"#;

    #[test]
    fn test_parse_project() {
        let project = SessionProject::from_json_str(PROJECT).unwrap();
        assert_eq!(project.name, "Episode 3");
        assert_eq!(project.tracks.len(), 1);
        assert_eq!(project.tracks[0].id.as_str(), "dub-fr");
        let index = SegmentIndex::new(project.tracks[0].segments.clone()).unwrap();
        assert_eq!(index.segment_at(7.0).unwrap().playback_rate, 1.1);
    }

    #[test]
    fn test_name_defaults() {
        let project = SessionProject::from_json_str(r#"{"duration": 1.0}"#).unwrap();
        assert_eq!(project.name, "Untitled Session");
        assert!(project.tracks.is_empty());
    }

    #[test]
    fn test_rejects_overlapping_track() {
        let text = r#"{"duration": 10.0, "tracks": [{"id": "t", "segments": [
            {"id": "A", "start": 0.0, "end": 5.0, "audio_source": "a"},
            {"id": "B", "start": 4.0, "end": 6.0, "audio_source": "b"}
        ]}]}"#;
        assert!(matches!(
            SessionProject::from_json_str(text),
            Err(CoreError::OverlappingSegments { .. })
        ));
    }

    #[test]
    fn test_rejects_negative_duration() {
        assert!(matches!(
            SessionProject::from_json_str(r#"{"duration": -2.0}"#),
            Err(CoreError::InvalidDuration(_))
        ));
    }
}
