//! Video Sync Controller
//!
//! Keeps the single video surface in line with the transport:
//! - Paused: the surface position is pulled toward the playhead through the throttler
//!   whenever they diverge beyond the tolerance.
//! - Playing: the surface advances natively and is left alone, except for explicit
//!   jumps made by the user.
//! - Scrubbing: every playhead move is routed through the throttler's fast path.
//!
//! Native notifications from the surface flow back into the transport so the UI never
//! disagrees with the physical media about play state.

use crate::surface::VideoSurface;
use crate::throttle::SeekThrottler;
use dubsync_core::{SyncConfig, TimePoint, Transport, TransportSnapshot};
use std::time::Instant;
use tracing::{debug, trace, warn};

const POSITION_EPSILON: f64 = 1e-6;

/// Reconciles the video surface against transport snapshots
#[derive(Debug, Clone)]
pub struct VideoSyncController {
    tolerance: f64,
    last_playing: Option<bool>,
    last_scrubbing: bool,
    last_rate: Option<f64>,
    force_resync: bool,
    /// Last playhead the controller accounted for while playing. A snapshot with a
    /// different playhead means the user jumped.
    last_advance: Option<TimePoint>,
    /// A jump during playback could not be applied to the surface yet. Time updates
    /// are ignored until it lands.
    jump_deferred: bool,
    last_scrub_target: Option<TimePoint>,
    play_rejected: bool,
}

impl VideoSyncController {
    /// Create a controller with the given position tolerance in seconds
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            last_playing: None,
            last_scrubbing: false,
            last_rate: None,
            force_resync: false,
            last_advance: None,
            jump_deferred: false,
            last_scrub_target: None,
            play_rejected: false,
        }
    }

    /// Create a controller from engine configuration
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.video_sync_tolerance)
    }

    /// Run one reconciliation pass against `snapshot`
    pub fn reconcile<V: VideoSurface + ?Sized>(
        &mut self,
        snapshot: &TransportSnapshot,
        now: Instant,
        surface: &mut V,
        throttler: &mut SeekThrottler,
    ) {
        throttler.poll(now, surface);

        if self.last_rate != Some(snapshot.playback_rate) {
            if (surface.playback_rate() - snapshot.playback_rate).abs() > f64::EPSILON {
                surface.set_playback_rate(snapshot.playback_rate);
                debug!(rate = snapshot.playback_rate, "Applied playback rate to surface");
            }
            self.last_rate = Some(snapshot.playback_rate);
        }

        if self.last_scrubbing && !snapshot.is_scrubbing {
            throttler.finish_scrub(snapshot.playhead, now, surface);
            self.force_resync = false;
            self.last_scrub_target = None;
        }
        self.last_scrubbing = snapshot.is_scrubbing;

        if self.last_playing != Some(snapshot.is_playing) {
            self.apply_play_intent(snapshot, now, surface, throttler);
            self.last_playing = Some(snapshot.is_playing);
        }

        if snapshot.is_scrubbing {
            if self.last_scrub_target != Some(snapshot.playhead) {
                throttler.request_seek(snapshot.playhead, true, now, surface);
                self.last_scrub_target = Some(snapshot.playhead);
            }
        } else if snapshot.is_playing {
            throttler.cancel_pending();
            if self.jump_deferred || self.last_advance != Some(snapshot.playhead) {
                self.follow_jump(snapshot, now, surface, throttler);
            }
        } else {
            self.last_advance = None;
            self.jump_deferred = false;
            if !surface.is_metadata_loaded() {
                trace!("Surface metadata not loaded, deferring paused reconcile");
                return;
            }
            if self.force_resync || self.drift(snapshot, surface) > self.tolerance {
                self.force_resync = false;
                throttler.request_seek(snapshot.playhead, false, now, surface);
            }
        }
    }

    fn apply_play_intent<V: VideoSurface + ?Sized>(
        &mut self,
        snapshot: &TransportSnapshot,
        now: Instant,
        surface: &mut V,
        throttler: &mut SeekThrottler,
    ) {
        if !snapshot.is_playing {
            if !surface.is_paused() {
                surface.pause();
                debug!(playhead = snapshot.playhead, "Paused surface");
            }
            return;
        }

        if snapshot.is_scrubbing {
            self.last_advance = Some(snapshot.playhead);
        } else {
            self.follow_jump(snapshot, now, surface, throttler);
        }

        if surface.is_paused() {
            match surface.play() {
                Ok(()) => debug!(playhead = snapshot.playhead, "Started surface"),
                Err(e) => {
                    warn!(error = %e, "Surface refused to start playback");
                    self.play_rejected = true;
                }
            }
        }
    }

    fn follow_jump<V: VideoSurface + ?Sized>(
        &mut self,
        snapshot: &TransportSnapshot,
        now: Instant,
        surface: &mut V,
        throttler: &mut SeekThrottler,
    ) {
        if self.drift(snapshot, surface) > self.tolerance {
            debug!(playhead = snapshot.playhead, "Playhead jumped during playback");
            if throttler.seek_now(snapshot.playhead, now, surface).is_none() {
                self.jump_deferred = true;
                return;
            }
        }
        self.jump_deferred = false;
        self.last_advance = Some(snapshot.playhead);
    }

    fn drift<V: VideoSurface + ?Sized>(&self, snapshot: &TransportSnapshot, surface: &V) -> f64 {
        (surface.current_time() - snapshot.playhead).abs()
    }

    /// Whether the last play command was refused. Reading clears the flag.
    ///
    /// The host reports the surface's real state back through `on_surface_pause`.
    pub fn take_play_rejection(&mut self) -> bool {
        std::mem::take(&mut self.play_rejected)
    }

    /// The surface started playing
    pub fn on_surface_play(&mut self, transport: &Transport) {
        let mut state = transport.write();
        if !state.is_playing() {
            debug!("Surface started on its own, adopting play state");
        }
        state.set_playing(true);
        self.last_playing = Some(true);
        self.last_advance = Some(state.playhead());
    }

    /// The surface paused, possibly against the transport's intent
    pub fn on_surface_pause(&mut self, transport: &Transport) {
        let mut state = transport.write();
        if state.is_playing() {
            debug!("Surface paused against play intent, reconciling transport");
        }
        state.set_playing(false);
        self.last_playing = Some(false);
    }

    /// Native playback advanced. Writes the surface position into the transport
    /// while playing and not scrubbing.
    pub fn on_surface_time_update<V: VideoSurface + ?Sized>(
        &mut self,
        surface: &V,
        transport: &Transport,
    ) {
        let mut state = transport.write();
        if !state.is_playing() || state.is_scrubbing() {
            return;
        }
        if self.jump_deferred {
            trace!(playhead = state.playhead(), "Jump not applied yet, ignoring time update");
            return;
        }
        if let Some(last) = self.last_advance {
            if (last - state.playhead()).abs() > POSITION_EPSILON {
                trace!(playhead = state.playhead(), "User jump pending, ignoring time update");
                return;
            }
        }
        state.advance_to(surface.current_time());
        self.last_advance = Some(state.playhead());
    }

    /// Surface metadata became available; the next paused pass re-seeks unconditionally
    pub fn on_surface_metadata_loaded(&mut self) {
        debug!("Surface metadata loaded");
        self.force_resync = true;
    }

    /// Surface reached the end of the media
    pub fn on_surface_ended<V: VideoSurface + ?Sized>(&mut self, surface: &V, transport: &Transport) {
        let mut state = transport.write();
        state.advance_to(surface.current_time());
        state.pause();
        self.last_playing = Some(false);
        self.last_advance = None;
        self.jump_deferred = false;
        debug!(playhead = state.playhead(), "Surface ended");
    }
}
