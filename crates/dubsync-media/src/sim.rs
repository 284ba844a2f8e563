//! Simulated media primitives
//!
//! In-memory implementations of the media contracts that record every command they
//! receive. They back the test-suite and the headless replayer; playback is emulated
//! by calling `advance`.

use crate::surface::{AudioTrack, AudioTrackPool, TrackHandle, VideoSurface};
use crate::{MediaError, Result};
use dubsync_core::{AudioSourceRef, SegmentId, TimePoint};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// A command received by the simulated video surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum SurfaceCommand {
    /// `set_current_time`
    Seek(TimePoint),
    /// `set_playback_rate`
    SetRate(f64),
    /// `play`, accepted or not
    Play,
    /// `pause`
    Pause,
}

/// Simulated video surface
#[derive(Debug, Clone)]
pub struct SimVideoSurface {
    time: TimePoint,
    duration: TimePoint,
    rate: f64,
    paused: bool,
    metadata_loaded: bool,
    reject_next_play: bool,
    log: Vec<SurfaceCommand>,
}

impl SimVideoSurface {
    /// Paused surface at 0 with loaded metadata
    pub fn new(duration: TimePoint) -> Self {
        Self {
            time: 0.0,
            duration,
            rate: 1.0,
            paused: true,
            metadata_loaded: true,
            reject_next_play: false,
            log: Vec::new(),
        }
    }

    /// Builder-style metadata flag
    pub fn with_metadata_loaded(mut self, loaded: bool) -> Self {
        self.metadata_loaded = loaded;
        self
    }

    /// Flip the metadata flag, as a readiness notification would
    pub fn set_metadata_loaded(&mut self, loaded: bool) {
        self.metadata_loaded = loaded;
    }

    /// Refuse the next `play` call, like a blocked autoplay
    pub fn reject_next_play(&mut self) {
        self.reject_next_play = true;
    }

    /// Emulate native playback for `dt` seconds. Returns `true` when the end was reached.
    pub fn advance(&mut self, dt: f64) -> bool {
        if self.paused {
            return false;
        }
        self.time += dt * self.rate;
        if self.duration > 0.0 && self.time >= self.duration {
            self.time = self.duration;
            self.paused = true;
            return true;
        }
        false
    }

    /// Commands received so far
    pub fn commands(&self) -> &[SurfaceCommand] {
        &self.log
    }

    /// Forget recorded commands
    pub fn clear_commands(&mut self) {
        self.log.clear();
    }

    /// Positions of every seek received
    pub fn seeks(&self) -> Vec<TimePoint> {
        self.log
            .iter()
            .filter_map(|c| match c {
                SurfaceCommand::Seek(t) => Some(*t),
                _ => None,
            })
            .collect()
    }
}

impl VideoSurface for SimVideoSurface {
    fn current_time(&self) -> TimePoint {
        self.time
    }

    fn set_current_time(&mut self, time: TimePoint) {
        self.log.push(SurfaceCommand::Seek(time));
        self.time = time;
    }

    fn playback_rate(&self) -> f64 {
        self.rate
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.log.push(SurfaceCommand::SetRate(rate));
        self.rate = rate;
    }

    fn play(&mut self) -> Result<()> {
        self.log.push(SurfaceCommand::Play);
        if !self.metadata_loaded {
            return Err(MediaError::MetadataNotLoaded);
        }
        if std::mem::take(&mut self.reject_next_play) {
            return Err(MediaError::PlayRejected(
                "autoplay blocked by environment".to_string(),
            ));
        }
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.log.push(SurfaceCommand::Pause);
        self.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn is_metadata_loaded(&self) -> bool {
        self.metadata_loaded
    }
}

/// A command received by a simulated audio track
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum TrackCommand {
    /// `set_current_time`
    Seek(TimePoint),
    /// `set_playback_rate`
    SetRate(f64),
    /// `play`, accepted or not
    Play,
    /// `pause`
    Pause,
}

#[derive(Debug)]
struct SimTrackState {
    time: TimePoint,
    rate: f64,
    paused: bool,
    reject_play: bool,
    log: Vec<TrackCommand>,
}

/// Simulated audio track for one generation of a segment's audio
#[derive(Debug)]
pub struct SimAudioTrack {
    source: AudioSourceRef,
    state: Mutex<SimTrackState>,
}

impl SimAudioTrack {
    /// Paused track at offset 0
    pub fn new(source: impl Into<AudioSourceRef>) -> Self {
        Self {
            source: source.into(),
            state: Mutex::new(SimTrackState {
                time: 0.0,
                rate: 1.0,
                paused: true,
                reject_play: false,
                log: Vec::new(),
            }),
        }
    }

    /// Refuse every `play` call while set
    pub fn set_reject_play(&self, reject: bool) {
        self.state.lock().reject_play = reject;
    }

    /// Emulate native playback for `dt` seconds
    pub fn advance(&self, dt: f64) {
        let mut state = self.state.lock();
        if !state.paused {
            state.time += dt * state.rate;
        }
    }

    /// Commands received so far
    pub fn commands(&self) -> Vec<TrackCommand> {
        self.state.lock().log.clone()
    }

    /// Number of `play` calls received
    pub fn play_count(&self) -> usize {
        self.state
            .lock()
            .log
            .iter()
            .filter(|c| matches!(c, TrackCommand::Play))
            .count()
    }
}

impl AudioTrack for SimAudioTrack {
    fn source(&self) -> &AudioSourceRef {
        &self.source
    }

    fn current_time(&self) -> TimePoint {
        self.state.lock().time
    }

    fn set_current_time(&self, time: TimePoint) {
        let mut state = self.state.lock();
        state.log.push(TrackCommand::Seek(time));
        state.time = time;
    }

    fn playback_rate(&self) -> f64 {
        self.state.lock().rate
    }

    fn set_playback_rate(&self, rate: f64) {
        let mut state = self.state.lock();
        state.log.push(TrackCommand::SetRate(rate));
        state.rate = rate;
    }

    fn play(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.log.push(TrackCommand::Play);
        if state.reject_play {
            return Err(MediaError::PlayRejected(format!(
                "track {} blocked by environment",
                self.source
            )));
        }
        state.paused = false;
        Ok(())
    }

    fn pause(&self) {
        let mut state = self.state.lock();
        state.log.push(TrackCommand::Pause);
        state.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.state.lock().paused
    }
}

#[derive(Debug, Clone)]
struct PoolEntry {
    track: Arc<SimAudioTrack>,
    ready: bool,
}

/// Simulated preloading collaborator for one audio lane.
///
/// Cloning shares the pool, so a test or replayer can keep a handle after giving one
/// to the session.
#[derive(Debug, Clone, Default)]
pub struct SimTrackPool {
    entries: Arc<RwLock<HashMap<SegmentId, PoolEntry>>>,
}

impl SimTrackPool {
    /// Empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload a track for `segment`, replacing any previous generation
    pub fn preload(
        &self,
        segment: impl Into<SegmentId>,
        source: impl Into<AudioSourceRef>,
        ready: bool,
    ) -> Arc<SimAudioTrack> {
        let track = Arc::new(SimAudioTrack::new(source));
        self.entries.write().insert(
            segment.into(),
            PoolEntry {
                track: Arc::clone(&track),
                ready,
            },
        );
        track
    }

    /// Mark a segment's track as buffered
    pub fn set_ready(&self, segment: &SegmentId, ready: bool) {
        if let Some(entry) = self.entries.write().get_mut(segment) {
            entry.ready = ready;
        }
    }

    /// Concrete track currently preloaded for a segment
    pub fn sim_track(&self, segment: &SegmentId) -> Option<Arc<SimAudioTrack>> {
        self.entries
            .read()
            .get(segment)
            .map(|e| Arc::clone(&e.track))
    }

    /// Advance every playing track by `dt` seconds
    pub fn advance_all(&self, dt: f64) {
        for entry in self.entries.read().values() {
            entry.track.advance(dt);
        }
    }

    /// Command logs of every preloaded track, keyed by segment
    pub fn command_logs(&self) -> HashMap<SegmentId, Vec<TrackCommand>> {
        self.entries
            .read()
            .iter()
            .map(|(id, e)| (id.clone(), e.track.commands()))
            .collect()
    }
}

impl AudioTrackPool for SimTrackPool {
    fn track(&self, segment: &SegmentId) -> Option<TrackHandle> {
        self.entries
            .read()
            .get(segment)
            .map(|e| Arc::clone(&e.track) as TrackHandle)
    }

    fn is_ready(&self, segment: &SegmentId) -> bool {
        self.entries
            .read()
            .get(segment)
            .map(|e| e.ready)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_advance_stops_at_end() {
        let mut surface = SimVideoSurface::new(2.0);
        surface.play().unwrap();
        assert!(!surface.advance(1.5));
        assert!(surface.advance(1.0));
        assert_eq!(surface.current_time(), 2.0);
        assert!(surface.is_paused());
    }

    #[test]
    fn test_surface_rejects_once() {
        let mut surface = SimVideoSurface::new(10.0);
        surface.reject_next_play();
        assert!(surface.play().is_err());
        assert!(surface.is_paused());
        assert!(surface.play().is_ok());
        assert!(!surface.is_paused());
    }

    #[test]
    fn test_surface_needs_metadata_to_play() {
        let mut surface = SimVideoSurface::new(10.0).with_metadata_loaded(false);
        assert!(matches!(surface.play(), Err(MediaError::MetadataNotLoaded)));
        surface.set_metadata_loaded(true);
        assert!(surface.play().is_ok());
    }

    #[test]
    fn test_pool_regeneration_replaces_handle() {
        let pool = SimTrackPool::new();
        let first = pool.preload("A", "gen-1", true);
        let second = pool.preload("A", "gen-2", false);
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(!pool.is_ready(&"A".into()));
        assert_eq!(pool.sim_track(&"A".into()).unwrap().source().as_str(), "gen-2");
    }

    #[test]
    fn test_track_records_commands() {
        let track = SimAudioTrack::new("x");
        track.set_current_time(1.5);
        track.play().unwrap();
        track.advance(0.5);
        track.pause();
        assert_eq!(track.current_time(), 2.0);
        assert_eq!(
            track.commands(),
            vec![TrackCommand::Seek(1.5), TrackCommand::Play, TrackCommand::Pause]
        );
        assert_eq!(track.play_count(), 1);
    }
}
