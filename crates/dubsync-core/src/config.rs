//! Engine configuration
//!
//! All thresholds and intervals of the synchronization engine are tunables, loaded from
//! TOML. Every field has a default so an empty file is a valid configuration.

use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Tunables for seek throttling, keyframe snapping and drift correction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Minimum spacing between real seeks on the video surface (milliseconds)
    pub seek_throttle_ms: u64,
    /// GOP size in seconds used to snap scrub seeks to keyframes
    pub keyframe_interval: f64,
    /// Jumps larger than this (seconds) snap to a keyframe while scrubbing
    pub fine_seek_threshold: f64,
    /// Paused video is re-seeked when it drifts further than this from the playhead (seconds)
    pub video_sync_tolerance: f64,
    /// Audio offset is rewritten when it drifts further than this (seconds)
    pub audio_drift_tolerance: f64,
    /// Minimum spacing between offset corrections of a playing audio track (milliseconds)
    pub offset_sync_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            seek_throttle_ms: 100,
            keyframe_interval: 2.0,
            fine_seek_threshold: 1.0,
            video_sync_tolerance: 0.05,
            audio_drift_tolerance: 0.1,
            offset_sync_interval_ms: 500,
        }
    }
}

impl SyncConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.seek_throttle_ms == 0 {
            return Err(CoreError::InvalidConfig(
                "seek_throttle_ms must be greater than zero".to_string(),
            ));
        }
        if !(self.keyframe_interval.is_finite() && self.keyframe_interval > 0.0) {
            return Err(CoreError::InvalidConfig(format!(
                "keyframe_interval must be positive, got {}",
                self.keyframe_interval
            )));
        }
        for (name, value) in [
            ("fine_seek_threshold", self.fine_seek_threshold),
            ("video_sync_tolerance", self.video_sync_tolerance),
            ("audio_drift_tolerance", self.audio_drift_tolerance),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(CoreError::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Seek throttle window
    pub fn seek_throttle(&self) -> Duration {
        Duration::from_millis(self.seek_throttle_ms)
    }

    /// Offset correction interval for playing audio
    pub fn offset_sync_interval(&self) -> Duration {
        Duration::from_millis(self.offset_sync_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.seek_throttle(), Duration::from_millis(100));
        assert_eq!(config.offset_sync_interval(), Duration::from_millis(500));
        assert_eq!(config.keyframe_interval, 2.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = SyncConfig::from_toml_str("").unwrap();
        assert_eq!(config, SyncConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = SyncConfig::from_toml_str("keyframe_interval = 4.0\nseek_throttle_ms = 250\n")
            .unwrap();
        assert_eq!(config.keyframe_interval, 4.0);
        assert_eq!(config.seek_throttle_ms, 250);
        assert_eq!(config.fine_seek_threshold, 1.0);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(SyncConfig::from_toml_str("keyframe_interval = 0.0").is_err());
        assert!(SyncConfig::from_toml_str("seek_throttle_ms = 0").is_err());
        assert!(SyncConfig::from_toml_str("audio_drift_tolerance = -0.5").is_err());
        assert!(matches!(
            SyncConfig::from_toml_str("keyframe_interval = \"fast\""),
            Err(CoreError::ConfigParse(_))
        ));
    }
}
