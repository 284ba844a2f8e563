//! Seek Throttler and Keyframe Resolver
//!
//! Decouples the rate at which the playhead moves (up to once per display frame while
//! scrubbing) from the rate at which the video surface is really seeked. At most one seek
//! is issued per window; requests arriving inside the window replace each other and only
//! the latest fires when the window elapses (trailing edge). Nothing is ever queued.
//!
//! While scrubbing, large jumps snap back to the nearest keyframe boundary, which
//! decodes much faster than an exact frame. The final seek at scrub end is always exact.

use crate::surface::VideoSurface;
use dubsync_core::{SyncConfig, TimePoint};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Positions closer than this are considered identical
const POSITION_EPSILON: f64 = 1e-6;

/// Greatest multiple of `gop` that is `<= target`, never negative
pub fn resolve_keyframe(target: TimePoint, gop: f64) -> TimePoint {
    if gop.is_nan() || gop <= 0.0 || !target.is_finite() {
        return target.max(0.0);
    }
    ((target / gop).floor() * gop).max(0.0)
}

/// How a seek was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SeekKind {
    /// Exact frame seek
    Exact,
    /// Snapped to a keyframe boundary
    Keyframe,
}

/// A seek actually issued to the surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeekCommand {
    /// Target that was requested
    pub requested: TimePoint,
    /// Position the surface was commanded to
    pub position: TimePoint,
    /// Resolution mode
    pub kind: SeekKind,
}

/// Seek throttling statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SeekStats {
    /// Exact seeks issued
    pub exact_seeks: u64,
    /// Keyframe seeks issued
    pub keyframe_seeks: u64,
    /// Requests replaced by a later one inside the same window
    pub coalesced: u64,
    /// Requests dropped because surface metadata was not loaded
    pub dropped: u64,
    /// Requests skipped because the surface was already there
    pub duplicates: u64,
}

#[derive(Debug, Clone, Copy)]
struct PendingSeek {
    target: TimePoint,
    is_scrubbing: bool,
}

/// Trailing-edge seek throttle with keyframe snapping
#[derive(Debug, Clone)]
pub struct SeekThrottler {
    window: Duration,
    keyframe_interval: f64,
    fine_seek_threshold: f64,
    last_fired: Option<Instant>,
    pending: Option<PendingSeek>,
    stats: SeekStats,
}

impl SeekThrottler {
    /// Create a throttler
    ///
    /// # Arguments
    /// * `window` - Minimum spacing between real seeks
    /// * `keyframe_interval` - GOP size in seconds
    /// * `fine_seek_threshold` - Scrub jumps above this snap to a keyframe
    pub fn new(window: Duration, keyframe_interval: f64, fine_seek_threshold: f64) -> Self {
        Self {
            window,
            keyframe_interval,
            fine_seek_threshold,
            last_fired: None,
            pending: None,
            stats: SeekStats::default(),
        }
    }

    /// Create a throttler from engine configuration
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            config.seek_throttle(),
            config.keyframe_interval,
            config.fine_seek_threshold,
        )
    }

    /// Request a seek. Fires immediately if the window is open, otherwise becomes
    /// the pending trailing request, replacing any earlier one.
    pub fn request_seek<V: VideoSurface + ?Sized>(
        &mut self,
        target: TimePoint,
        is_scrubbing: bool,
        now: Instant,
        surface: &mut V,
    ) -> Option<SeekCommand> {
        if !surface.is_metadata_loaded() {
            self.drop_unloaded(target);
            return None;
        }

        if self.window_open(now) {
            self.pending = None;
            return self.fire(target, is_scrubbing, now, surface);
        }

        if self
            .pending
            .replace(PendingSeek {
                target,
                is_scrubbing,
            })
            .is_some()
        {
            self.stats.coalesced += 1;
            trace!(target, "Coalesced seek request");
        }
        None
    }

    /// Fire the pending request if its window has elapsed.
    ///
    /// The event loop calls this at `next_deadline()`.
    pub fn poll<V: VideoSurface + ?Sized>(
        &mut self,
        now: Instant,
        surface: &mut V,
    ) -> Option<SeekCommand> {
        if self.pending.is_none() || !self.window_open(now) {
            return None;
        }
        let pending = self.pending.take()?;
        if !surface.is_metadata_loaded() {
            self.drop_unloaded(pending.target);
            return None;
        }
        self.fire(pending.target, pending.is_scrubbing, now, surface)
    }

    /// Issue an exact seek right away, bypassing the throttle and discarding any pending
    /// request. Used for the corrective seek at scrub end and for discrete jumps.
    pub fn seek_now<V: VideoSurface + ?Sized>(
        &mut self,
        target: TimePoint,
        now: Instant,
        surface: &mut V,
    ) -> Option<SeekCommand> {
        self.pending = None;
        if !surface.is_metadata_loaded() {
            self.drop_unloaded(target);
            return None;
        }
        Some(self.command(target, target, SeekKind::Exact, now, surface))
    }

    /// Final exact seek when a scrub gesture ends
    pub fn finish_scrub<V: VideoSurface + ?Sized>(
        &mut self,
        target: TimePoint,
        now: Instant,
        surface: &mut V,
    ) -> Option<SeekCommand> {
        debug!(target, "Scrub finished, correcting to exact position");
        self.seek_now(target, now, surface)
    }

    /// Forget the pending request
    pub fn cancel_pending(&mut self) {
        self.pending = None;
    }

    /// Whether a trailing request is waiting
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When `poll` must run to fire the pending request
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending?;
        self.last_fired.map(|last| last + self.window)
    }

    /// Statistics
    pub fn stats(&self) -> SeekStats {
        self.stats
    }

    fn window_open(&self, now: Instant) -> bool {
        match self.last_fired {
            Some(last) => now.saturating_duration_since(last) >= self.window,
            None => true,
        }
    }

    fn drop_unloaded(&mut self, target: TimePoint) {
        self.pending = None;
        self.stats.dropped += 1;
        debug!(target, "Surface metadata not loaded, dropping seek");
    }

    fn fire<V: VideoSurface + ?Sized>(
        &mut self,
        target: TimePoint,
        is_scrubbing: bool,
        now: Instant,
        surface: &mut V,
    ) -> Option<SeekCommand> {
        let current = surface.current_time();
        let (position, kind) =
            if is_scrubbing && (target - current).abs() > self.fine_seek_threshold {
                (
                    resolve_keyframe(target, self.keyframe_interval),
                    SeekKind::Keyframe,
                )
            } else {
                (target, SeekKind::Exact)
            };

        if (current - position).abs() < POSITION_EPSILON {
            self.stats.duplicates += 1;
            trace!(position, "Surface already at seek target");
            return None;
        }

        Some(self.command(target, position, kind, now, surface))
    }

    fn command<V: VideoSurface + ?Sized>(
        &mut self,
        requested: TimePoint,
        position: TimePoint,
        kind: SeekKind,
        now: Instant,
        surface: &mut V,
    ) -> SeekCommand {
        surface.set_current_time(position);
        self.last_fired = Some(now);
        match kind {
            SeekKind::Exact => self.stats.exact_seeks += 1,
            SeekKind::Keyframe => self.stats.keyframe_seeks += 1,
        }
        debug!(requested, position, ?kind, "Seek issued");
        SeekCommand {
            requested,
            position,
            kind,
        }
    }
}
