//! Audio Segment Player
//!
//! Keeps exactly one audio track live and positioned for a segmented audio lane while
//! the playhead moves and segments are regenerated underneath it.
//!
//! Each pass resolves the segment under the playhead and applies, in order:
//! 1. Segment change (including entering a gap) while playing or scrubbing
//! 2. Source hot-swap on the current segment
//! 3. Play intent change on the active track
//! 4. In-segment rate change and coarse drift correction while playing
//! 5. Unthrottled offset correction while scrubbing
//! 6. Tolerance-gated offset correction after a discrete jump while paused
//!
//! Activation commits re-read the transport at the moment they complete, so a pause
//! that lands before a track becomes ready never results in a `play` call. A handle
//! only counts as playable once it was built from the segment's current audio source;
//! until the preloader catches up after a regeneration the activation stays parked.

use crate::surface::{AudioTrackPool, TrackHandle};
use dubsync_core::{
    AudioSourceRef, Segment, SegmentId, SegmentIndex, SyncConfig, TrackId, Transport,
    TransportSnapshot,
};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

const POSITION_EPSILON: f64 = 1e-6;

/// Audio player statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlayerStats {
    /// Tracks positioned and claimed as active
    pub activations: u64,
    /// Re-activations caused by a changed audio source
    pub hot_swaps: u64,
    /// Segments that should have been audible but had no preloaded handle
    pub missing_handles: u64,
    /// `play` calls refused by the environment
    pub rejected_starts: u64,
    /// Readiness notifications that arrived after their activation went stale
    pub stale_completions: u64,
}

#[derive(Clone)]
struct ActiveTrack {
    segment: SegmentId,
    handle: TrackHandle,
}

#[derive(Debug, Clone, PartialEq)]
struct PendingActivation {
    segment: SegmentId,
    source: AudioSourceRef,
}

enum Lookup {
    Playable(TrackHandle),
    Missing,
    Outdated(AudioSourceRef),
    Buffering,
}

/// Resolve the preloaded handle for the segment's current audio source
fn lookup<P: AudioTrackPool + ?Sized>(segment: &Segment, pool: &P) -> Lookup {
    match pool.track(&segment.id) {
        None => Lookup::Missing,
        Some(handle) if *handle.source() != segment.audio_source => {
            Lookup::Outdated(handle.source().clone())
        }
        Some(_) if !pool.is_ready(&segment.id) => Lookup::Buffering,
        Some(handle) => Lookup::Playable(handle),
    }
}

/// Plays the audio of one segmented track in step with the transport
pub struct AudioSegmentPlayer {
    track: TrackId,
    drift_tolerance: f64,
    offset_sync_interval: Duration,
    current: Option<SegmentId>,
    active: Option<ActiveTrack>,
    pending: Option<PendingActivation>,
    last_source: Option<AudioSourceRef>,
    last_playing: Option<bool>,
    last_offset_sync: Option<Instant>,
    stats: PlayerStats,
}

impl std::fmt::Debug for AudioSegmentPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioSegmentPlayer")
            .field("track", &self.track)
            .field("current", &self.current)
            .field("active", &self.active.as_ref().map(|a| &a.segment))
            .field("pending", &self.pending)
            .field("stats", &self.stats)
            .finish()
    }
}

impl AudioSegmentPlayer {
    /// Create a player
    ///
    /// # Arguments
    /// * `track` - Lane this player serves, used in diagnostics
    /// * `drift_tolerance` - Offset error in seconds tolerated before repositioning
    /// * `offset_sync_interval` - Minimum spacing of drift corrections during playback
    pub fn new(track: TrackId, drift_tolerance: f64, offset_sync_interval: Duration) -> Self {
        Self {
            track,
            drift_tolerance,
            offset_sync_interval,
            current: None,
            active: None,
            pending: None,
            last_source: None,
            last_playing: None,
            last_offset_sync: None,
            stats: PlayerStats::default(),
        }
    }

    /// Create a player from engine configuration
    pub fn from_config(track: TrackId, config: &SyncConfig) -> Self {
        Self::new(
            track,
            config.audio_drift_tolerance,
            config.offset_sync_interval(),
        )
    }

    /// Run one reconciliation pass against `snapshot`
    pub fn reconcile<P: AudioTrackPool + ?Sized>(
        &mut self,
        snapshot: &TransportSnapshot,
        index: &SegmentIndex,
        pool: &P,
        transport: &Transport,
        now: Instant,
    ) {
        let live = snapshot.is_playing || snapshot.is_scrubbing;
        let segment = index.segment_at(snapshot.playhead);
        let mut activated = false;

        if segment.map(|s| &s.id) != self.current.as_ref() {
            if live {
                match segment {
                    Some(segment) => self.activate(segment, pool, transport, now),
                    None => self.enter_gap(snapshot),
                }
                activated = true;
            }
        } else if let Some(segment) = segment {
            if self.last_source.as_ref() != Some(&segment.audio_source) {
                if live {
                    debug!(
                        track = %self.track,
                        segment = %segment.id,
                        source = %segment.audio_source,
                        "Audio source changed during playback, hot-swapping"
                    );
                    self.stats.hot_swaps += 1;
                    self.activate(segment, pool, transport, now);
                    activated = true;
                } else {
                    self.drop_stale(segment);
                }
            }
        }

        if !activated {
            self.follow(snapshot, segment, transport, now);
        }
        // A pause written back during this pass means nothing was started
        self.last_playing = Some(snapshot.is_playing && transport.is_playing());
    }

    /// A preloaded track became ready. Completes the pending activation if it still
    /// matches the segment under the playhead and that segment's current source.
    ///
    /// Returns whether an activation was committed.
    pub fn on_track_ready<P: AudioTrackPool + ?Sized>(
        &mut self,
        segment_id: &SegmentId,
        index: &SegmentIndex,
        pool: &P,
        transport: &Transport,
        now: Instant,
    ) -> bool {
        let awaited = match &self.pending {
            Some(pending) if pending.segment == *segment_id => pending.clone(),
            _ => {
                trace!(track = %self.track, segment = %segment_id, "Readiness not awaited");
                return false;
            }
        };
        self.pending = None;

        let playhead = transport.read().playhead();
        let segment = match index.segment_at(playhead) {
            Some(s) if s.id == awaited.segment && s.audio_source == awaited.source => s,
            _ => {
                self.stats.stale_completions += 1;
                debug!(
                    track = %self.track,
                    segment = %awaited.segment,
                    playhead,
                    "Discarding stale activation"
                );
                return false;
            }
        };

        match lookup(segment, pool) {
            Lookup::Playable(handle) => {
                self.commit(segment, handle, transport, now);
                true
            }
            _ => {
                self.pending = Some(awaited);
                false
            }
        }
    }

    /// Pause the active track and forget all state. The handle itself stays with its pool.
    pub fn release(&mut self) {
        if let Some(active) = self.active.take() {
            active.handle.pause();
            debug!(track = %self.track, segment = %active.segment, "Released active track");
        }
        self.current = None;
        self.pending = None;
        self.last_source = None;
        self.last_playing = None;
        self.last_offset_sync = None;
    }

    /// Segment the player is bound to
    pub fn current_segment(&self) -> Option<&SegmentId> {
        self.current.as_ref()
    }

    /// Handle currently claimed as active
    pub fn active_handle(&self) -> Option<&TrackHandle> {
        self.active.as_ref().map(|a| &a.handle)
    }

    /// Whether an activation is waiting for its track to become ready
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Lane id
    pub fn track(&self) -> &TrackId {
        &self.track
    }

    /// Statistics
    pub fn stats(&self) -> PlayerStats {
        self.stats
    }

    fn activate<P: AudioTrackPool + ?Sized>(
        &mut self,
        segment: &Segment,
        pool: &P,
        transport: &Transport,
        now: Instant,
    ) {
        self.stop_active();
        self.current = Some(segment.id.clone());
        self.last_source = Some(segment.audio_source.clone());
        let awaited = PendingActivation {
            segment: segment.id.clone(),
            source: segment.audio_source.clone(),
        };

        match lookup(segment, pool) {
            Lookup::Playable(handle) => {
                self.commit(segment, handle, transport, now);
                return;
            }
            Lookup::Missing => {
                self.stats.missing_handles += 1;
                warn!(
                    track = %self.track,
                    segment = %segment.id,
                    "No preloaded audio for segment, staying silent"
                );
            }
            Lookup::Outdated(stale) => {
                debug!(
                    track = %self.track,
                    segment = %segment.id,
                    preloaded = %stale,
                    wanted = %segment.audio_source,
                    "Preloaded audio predates the segment's source, awaiting regenerated track"
                );
            }
            Lookup::Buffering => {
                debug!(track = %self.track, segment = %segment.id, "Track not ready, parking activation");
            }
        }
        self.pending = Some(awaited);
    }

    fn commit(&mut self, segment: &Segment, handle: TrackHandle, transport: &Transport, now: Instant) {
        let snapshot = transport.snapshot();
        let offset = segment.offset_of(snapshot.playhead).clamp(0.0, segment.duration());
        handle.set_current_time(offset);
        handle.set_playback_rate(segment.playback_rate);
        self.active = Some(ActiveTrack {
            segment: segment.id.clone(),
            handle: handle.clone(),
        });
        self.last_offset_sync = Some(now);
        self.stats.activations += 1;
        debug!(track = %self.track, segment = %segment.id, offset, "Activated track");

        if snapshot.is_playing {
            self.start(&handle);
        } else {
            debug!(
                track = %self.track,
                segment = %segment.id,
                "Play intent cleared before activation completed, not starting"
            );
        }
    }

    fn start(&mut self, handle: &TrackHandle) {
        if let Err(e) = handle.play() {
            self.stats.rejected_starts += 1;
            warn!(track = %self.track, error = %e, "Audio track refused to start");
        }
    }

    fn stop_active(&mut self) {
        if let Some(active) = self.active.take() {
            active.handle.pause();
            trace!(track = %self.track, segment = %active.segment, "Stopped previous track");
        }
        self.pending = None;
    }

    fn enter_gap(&mut self, snapshot: &TransportSnapshot) {
        self.stop_active();
        self.current = None;
        self.last_source = None;
        debug!(track = %self.track, playhead = snapshot.playhead, "Playhead entered a gap");
    }

    fn drop_stale(&mut self, segment: &Segment) {
        self.stop_active();
        self.current = None;
        self.last_source = Some(segment.audio_source.clone());
        debug!(
            track = %self.track,
            segment = %segment.id,
            source = %segment.audio_source,
            "Audio source changed while paused, recorded without restarting"
        );
    }

    fn follow(
        &mut self,
        snapshot: &TransportSnapshot,
        segment: Option<&Segment>,
        transport: &Transport,
        now: Instant,
    ) {
        let Some(active) = self.active.clone() else {
            return;
        };
        let handle = &active.handle;

        if self.last_playing != Some(snapshot.is_playing) {
            if snapshot.is_playing {
                if handle.is_paused() && transport.is_playing() {
                    self.start(handle);
                }
            } else {
                handle.pause();
            }
        }

        let Some(segment) = segment.filter(|s| s.id == active.segment) else {
            return;
        };

        if (handle.playback_rate() - segment.playback_rate).abs() > f64::EPSILON {
            handle.set_playback_rate(segment.playback_rate);
            debug!(track = %self.track, rate = segment.playback_rate, "Updated segment rate");
        }

        let expected = segment.offset_of(snapshot.playhead);
        let drift = (handle.current_time() - expected).abs();
        if snapshot.is_scrubbing {
            if drift > POSITION_EPSILON {
                handle.set_current_time(expected);
            }
        } else if snapshot.is_playing {
            let due = self
                .last_offset_sync
                .map_or(true, |last| now.saturating_duration_since(last) >= self.offset_sync_interval);
            if drift > self.drift_tolerance && due {
                handle.set_current_time(expected);
                self.last_offset_sync = Some(now);
                trace!(track = %self.track, drift, "Corrected audio drift");
            }
        } else if drift > self.drift_tolerance {
            handle.set_current_time(expected);
            trace!(track = %self.track, offset = expected, "Repositioned paused track");
        }
    }
}
