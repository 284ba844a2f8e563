//! Media primitive contracts
//!
//! The engine drives these without knowing how they decode or buffer. Implementations
//! wrap whatever the host environment provides.

use crate::Result;
use dubsync_core::{AudioSourceRef, SegmentId, TimePoint};
use std::sync::Arc;

/// The continuous video surface
pub trait VideoSurface {
    /// Current media position in seconds
    fn current_time(&self) -> TimePoint;

    /// Command a seek. Expensive: each call may flush and refill the decoder.
    fn set_current_time(&mut self, time: TimePoint);

    /// Current playback rate
    fn playback_rate(&self) -> f64;

    /// Apply a playback rate
    fn set_playback_rate(&mut self, rate: f64);

    /// Start playback. May be refused by the environment.
    fn play(&mut self) -> Result<()>;

    /// Pause playback
    fn pause(&mut self);

    /// Whether the surface is actually paused
    fn is_paused(&self) -> bool;

    /// Whether duration and seekable range are known
    fn is_metadata_loaded(&self) -> bool;
}

/// A pre-initialized audio resource for one segment.
///
/// Handles are shared with the preloading collaborator, so every method takes `&self`.
pub trait AudioTrack: Send + Sync {
    /// Audio source this handle was built from
    fn source(&self) -> &AudioSourceRef;

    /// Position inside the audio resource in seconds
    fn current_time(&self) -> TimePoint;

    /// Reposition inside the audio resource
    fn set_current_time(&self, time: TimePoint);

    /// Current playback rate
    fn playback_rate(&self) -> f64;

    /// Apply a playback rate
    fn set_playback_rate(&self, rate: f64);

    /// Start playback. May be refused by the environment.
    fn play(&self) -> Result<()>;

    /// Pause playback
    fn pause(&self);

    /// Whether the track is paused
    fn is_paused(&self) -> bool;
}

/// Borrowed reference to a preloaded audio track
pub type TrackHandle = Arc<dyn AudioTrack>;

/// Lookup of preloaded tracks by segment id.
///
/// Owned by the preloading collaborator; the engine never creates or disposes handles.
pub trait AudioTrackPool {
    /// Handle for a segment, if one has been preloaded. After a regeneration this may
    /// still be the previous generation until the preloader catches up.
    fn track(&self, segment: &SegmentId) -> Option<TrackHandle>;

    /// Whether the segment's handle has buffered enough to play without stalling
    fn is_ready(&self, segment: &SegmentId) -> bool;
}
