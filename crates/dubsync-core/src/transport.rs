//! Transport State - the single source of truth for playhead and play intent
//!
//! User input, keyboard shortcuts and the video surface's native callbacks all write
//! here; the video sync controller and audio segment players only read. Every
//! effective mutation bumps `revision` so reactors can skip work when nothing moved.

use crate::segment::TimePoint;
use crate::{CoreError, Result};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Mutable transport state of one editing session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportState {
    playhead: TimePoint,
    is_playing: bool,
    is_scrubbing: bool,
    playback_rate: f64,
    /// Timeline duration in seconds. The playhead never leaves `[0, duration]`.
    duration: TimePoint,
    #[serde(skip)]
    revision: u64,
}

impl Default for TransportState {
    fn default() -> Self {
        Self {
            playhead: 0.0,
            is_playing: false,
            is_scrubbing: false,
            playback_rate: 1.0,
            duration: 0.0,
            revision: 0,
        }
    }
}

impl TransportState {
    /// Create a paused transport at time 0 for a timeline of `duration` seconds
    pub fn new(duration: TimePoint) -> Result<Self> {
        let mut state = Self::default();
        state.set_duration(duration)?;
        Ok(state)
    }

    /// Current playhead in seconds
    pub fn playhead(&self) -> TimePoint {
        self.playhead
    }

    /// Play intent (not proof that media is actually playing)
    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Whether a scrub gesture is in progress
    pub fn is_scrubbing(&self) -> bool {
        self.is_scrubbing
    }

    /// Global playback rate
    pub fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    /// Timeline duration
    pub fn duration(&self) -> TimePoint {
        self.duration
    }

    /// Mutation counter
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Copy of the current values
    pub fn snapshot(&self) -> TransportSnapshot {
        TransportSnapshot {
            playhead: self.playhead,
            is_playing: self.is_playing,
            is_scrubbing: self.is_scrubbing,
            playback_rate: self.playback_rate,
            duration: self.duration,
            revision: self.revision,
        }
    }

    fn clamp(&self, time: TimePoint) -> TimePoint {
        if !time.is_finite() {
            return self.playhead;
        }
        time.clamp(0.0, self.duration)
    }

    fn set_playhead(&mut self, time: TimePoint) -> bool {
        let clamped = self.clamp(time);
        if clamped == self.playhead {
            return false;
        }
        self.playhead = clamped;
        self.revision += 1;
        true
    }

    /// Explicit seek. The playhead is clamped into `[0, duration]`.
    pub fn seek(&mut self, time: TimePoint) {
        if self.set_playhead(time) {
            debug!(playhead = self.playhead, "Seeked");
        }
    }

    /// Relative jump, e.g. a "skip 5 seconds" shortcut
    pub fn skip(&mut self, delta: TimePoint) {
        self.seek(self.playhead + delta);
    }

    /// Playback-driven advance reported by the media surface.
    ///
    /// Ignored unless playing and not scrubbing; while scrubbing the user owns the playhead.
    pub fn advance_to(&mut self, time: TimePoint) {
        if self.is_playing && !self.is_scrubbing {
            self.set_playhead(time);
        }
    }

    /// Set play intent
    pub fn set_playing(&mut self, playing: bool) {
        if self.is_playing != playing {
            self.is_playing = playing;
            self.revision += 1;
            debug!(playing, playhead = self.playhead, "Play intent changed");
        }
    }

    /// Start or resume playback
    pub fn play(&mut self) {
        self.set_playing(true);
    }

    /// Pause playback at the current position
    pub fn pause(&mut self) {
        self.set_playing(false);
    }

    /// Toggle play intent
    pub fn toggle_play(&mut self) {
        self.set_playing(!self.is_playing);
    }

    /// Begin a scrub gesture at `time`
    pub fn begin_scrub(&mut self, time: TimePoint) {
        if !self.is_scrubbing {
            self.is_scrubbing = true;
            self.revision += 1;
            debug!(playhead = self.playhead, "Scrub started");
        }
        self.set_playhead(time);
    }

    /// Move the playhead during a scrub gesture. Ignored when not scrubbing.
    pub fn scrub_to(&mut self, time: TimePoint) {
        if self.is_scrubbing {
            self.set_playhead(time);
        }
    }

    /// End the scrub gesture, keeping the playhead where it is
    pub fn end_scrub(&mut self) {
        if self.is_scrubbing {
            self.is_scrubbing = false;
            self.revision += 1;
            debug!(playhead = self.playhead, "Scrub ended");
        }
    }

    /// Change the global playback rate
    pub fn set_playback_rate(&mut self, rate: f64) -> Result<()> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(CoreError::InvalidPlaybackRate(rate));
        }
        if rate != self.playback_rate {
            self.playback_rate = rate;
            self.revision += 1;
            debug!(rate, "Playback rate changed");
        }
        Ok(())
    }

    /// Change the timeline duration, re-clamping the playhead
    pub fn set_duration(&mut self, duration: TimePoint) -> Result<()> {
        if !duration.is_finite() || duration < 0.0 {
            return Err(CoreError::InvalidDuration(duration));
        }
        if duration != self.duration {
            self.duration = duration;
            self.revision += 1;
            let playhead = self.playhead;
            self.set_playhead(playhead);
        }
        Ok(())
    }
}

/// Copyable view of the transport at one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransportSnapshot {
    /// Playhead in seconds
    pub playhead: TimePoint,
    /// Play intent
    pub is_playing: bool,
    /// Scrub gesture in progress
    pub is_scrubbing: bool,
    /// Global playback rate
    pub playback_rate: f64,
    /// Timeline duration
    pub duration: TimePoint,
    /// Mutation counter at the time of the snapshot
    pub revision: u64,
}

/// Shared handle to the transport state.
///
/// Cloning the handle shares the state. Writers hold the lock only for the duration of
/// a single mutation, so every change is immediately visible to the next reaction.
#[derive(Debug, Clone, Default)]
pub struct Transport {
    inner: Arc<RwLock<TransportState>>,
}

impl Transport {
    /// Wrap an existing state
    pub fn new(state: TransportState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    /// Shared read access
    pub fn read(&self) -> RwLockReadGuard<'_, TransportState> {
        self.inner.read()
    }

    /// Exclusive write access
    pub fn write(&self) -> RwLockWriteGuard<'_, TransportState> {
        self.inner.write()
    }

    /// Apply one mutation and return its result
    pub fn update<R>(&self, f: impl FnOnce(&mut TransportState) -> R) -> R {
        f(&mut self.inner.write())
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> TransportSnapshot {
        self.inner.read().snapshot()
    }

    /// Current play intent, read at call time
    pub fn is_playing(&self) -> bool {
        self.inner.read().is_playing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let state = TransportState::default();
        assert_eq!(state.playhead(), 0.0);
        assert!(!state.is_playing());
        assert!(!state.is_scrubbing());
        assert_eq!(state.playback_rate(), 1.0);
        assert_eq!(state.revision(), 0);
    }

    #[test]
    fn test_seek_clamps_to_duration() {
        let mut state = TransportState::new(30.0).unwrap();
        state.seek(45.0);
        assert_eq!(state.playhead(), 30.0);
        state.seek(-3.0);
        assert_eq!(state.playhead(), 0.0);
        state.seek(f64::NAN);
        assert_eq!(state.playhead(), 0.0);
    }

    #[test]
    fn test_empty_timeline_pins_playhead() {
        let mut state = TransportState::default();
        state.seek(1000.0);
        assert_eq!(state.playhead(), 0.0);
        state.skip(2.0);
        assert_eq!(state.playhead(), 0.0);
        assert_eq!(state.revision(), 0);
    }

    #[test]
    fn test_revision_only_bumps_on_effective_change() {
        let mut state = TransportState::new(10.0).unwrap();
        let start = state.revision();
        state.pause();
        state.seek(0.0);
        assert_eq!(state.revision(), start);
        state.play();
        assert_eq!(state.revision(), start + 1);
    }

    #[test]
    fn test_advance_ignored_while_scrubbing_or_paused() {
        let mut state = TransportState::new(10.0).unwrap();
        state.advance_to(2.0);
        assert_eq!(state.playhead(), 0.0);

        state.play();
        state.begin_scrub(4.0);
        state.advance_to(6.0);
        assert_eq!(state.playhead(), 4.0);

        state.end_scrub();
        state.advance_to(6.0);
        assert_eq!(state.playhead(), 6.0);
    }

    #[test]
    fn test_scrub_to_requires_gesture() {
        let mut state = TransportState::new(10.0).unwrap();
        state.scrub_to(5.0);
        assert_eq!(state.playhead(), 0.0);
        state.begin_scrub(1.0);
        state.scrub_to(5.0);
        assert_eq!(state.playhead(), 5.0);
    }

    #[test]
    fn test_invalid_rate_rejected() {
        let mut state = TransportState::default();
        assert!(state.set_playback_rate(0.0).is_err());
        assert!(state.set_playback_rate(-1.0).is_err());
        assert!(state.set_playback_rate(f64::INFINITY).is_err());
        state.set_playback_rate(1.5).unwrap();
        assert_eq!(state.playback_rate(), 1.5);
    }

    #[test]
    fn test_shrinking_duration_reclamps_playhead() {
        let mut state = TransportState::new(20.0).unwrap();
        state.seek(15.0);
        state.set_duration(10.0).unwrap();
        assert_eq!(state.playhead(), 10.0);
        assert!(state.set_duration(-1.0).is_err());
    }

    #[test]
    fn test_shared_handle_sees_writes() {
        let transport = Transport::new(TransportState::new(60.0).unwrap());
        let reader = transport.clone();
        transport.update(|s| s.play());
        assert!(reader.is_playing());
        transport.write().skip(5.0);
        assert_eq!(reader.snapshot().playhead, 5.0);
    }
}
