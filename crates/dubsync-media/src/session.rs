//! Sync Session
//!
//! Wires one transport, one video surface and any number of segmented audio lanes
//! together. The host event loop calls `tick` whenever the transport changed or a
//! throttle deadline elapsed, and forwards native media notifications.

use crate::audio_player::{AudioSegmentPlayer, PlayerStats};
use crate::surface::{AudioTrackPool, VideoSurface};
use crate::throttle::{SeekStats, SeekThrottler};
use crate::video_sync::VideoSyncController;
use crate::{MediaError, Result};
use dubsync_core::{Segment, SegmentId, SegmentIndex, SyncConfig, TrackId, Transport};
use std::time::Instant;
use tracing::{debug, info};

/// One segmented audio track with its own player
#[derive(Debug)]
pub struct AudioLane<P: AudioTrackPool> {
    id: TrackId,
    index: SegmentIndex,
    pool: P,
    player: AudioSegmentPlayer,
}

impl<P: AudioTrackPool> AudioLane<P> {
    /// Lane id
    pub fn id(&self) -> &TrackId {
        &self.id
    }

    /// Current segment index
    pub fn index(&self) -> &SegmentIndex {
        &self.index
    }

    /// Track pool backing this lane
    pub fn pool(&self) -> &P {
        &self.pool
    }

    /// The lane's player
    pub fn player(&self) -> &AudioSegmentPlayer {
        &self.player
    }

    /// Player statistics
    pub fn stats(&self) -> PlayerStats {
        self.player.stats()
    }
}

/// Segmented media synchronization session
pub struct SyncSession<V: VideoSurface, P: AudioTrackPool> {
    config: SyncConfig,
    transport: Transport,
    surface: V,
    throttler: SeekThrottler,
    video: VideoSyncController,
    lanes: Vec<AudioLane<P>>,
}

impl<V: VideoSurface, P: AudioTrackPool> SyncSession<V, P> {
    /// Create a session over `surface`, driven by `transport`
    pub fn new(config: SyncConfig, transport: Transport, surface: V) -> Result<Self> {
        config.validate()?;
        info!(
            throttle_ms = config.seek_throttle_ms,
            keyframe_interval = config.keyframe_interval,
            "Sync session created"
        );
        Ok(Self {
            throttler: SeekThrottler::from_config(&config),
            video: VideoSyncController::from_config(&config),
            config,
            transport,
            surface,
            lanes: Vec::new(),
        })
    }

    /// Add an audio lane
    pub fn add_lane(&mut self, id: TrackId, segments: Vec<Segment>, pool: P) -> Result<()> {
        if self.lanes.iter().any(|l| l.id == id) {
            return Err(MediaError::DuplicateTrack(id));
        }
        let index = SegmentIndex::new(segments)?;
        debug!(track = %id, segments = index.len(), "Added audio lane");
        self.lanes.push(AudioLane {
            player: AudioSegmentPlayer::from_config(id.clone(), &self.config),
            id,
            index,
            pool,
        });
        Ok(())
    }

    /// Replace a lane's segments. Source changes are picked up on the next tick.
    pub fn replace_segments(&mut self, track: &TrackId, segments: Vec<Segment>) -> Result<()> {
        let index = SegmentIndex::new(segments)?;
        let lane = self.lane_mut(track)?;
        debug!(track = %track, segments = index.len(), "Replaced segments");
        lane.index = index;
        Ok(())
    }

    /// Run the video and audio reactions against one transport snapshot
    pub fn tick(&mut self, now: Instant) {
        let snapshot = self.transport.snapshot();
        self.video
            .reconcile(&snapshot, now, &mut self.surface, &mut self.throttler);
        if self.video.take_play_rejection() {
            self.video.on_surface_pause(&self.transport);
        }
        for lane in &mut self.lanes {
            lane.player
                .reconcile(&snapshot, &lane.index, &lane.pool, &self.transport, now);
        }
    }

    /// Forward the surface's native play notification
    pub fn on_surface_play(&mut self) {
        self.video.on_surface_play(&self.transport);
    }

    /// Forward the surface's native pause notification
    pub fn on_surface_pause(&mut self) {
        self.video.on_surface_pause(&self.transport);
    }

    /// Forward the surface's native time update
    pub fn on_surface_time_update(&mut self) {
        self.video
            .on_surface_time_update(&self.surface, &self.transport);
    }

    /// Forward the surface's metadata notification
    pub fn on_surface_metadata_loaded(&mut self) {
        self.video.on_surface_metadata_loaded();
    }

    /// Forward the surface's ended notification
    pub fn on_surface_ended(&mut self) {
        self.video.on_surface_ended(&self.surface, &self.transport);
    }

    /// Forward a track readiness notification. Returns whether an activation completed.
    pub fn on_track_ready(
        &mut self,
        track: &TrackId,
        segment: &SegmentId,
        now: Instant,
    ) -> Result<bool> {
        let transport = self.transport.clone();
        let lane = self.lane_mut(track)?;
        Ok(lane
            .player
            .on_track_ready(segment, &lane.index, &lane.pool, &transport, now))
    }

    /// When the event loop must tick again for a trailing seek
    pub fn next_deadline(&self) -> Option<Instant> {
        self.throttler.next_deadline()
    }

    /// Seek throttling statistics
    pub fn seek_stats(&self) -> SeekStats {
        self.throttler.stats()
    }

    /// Lane by id
    pub fn lane(&self, id: &TrackId) -> Option<&AudioLane<P>> {
        self.lanes.iter().find(|l| l.id == *id)
    }

    /// All lanes, in insertion order
    pub fn lanes(&self) -> &[AudioLane<P>] {
        &self.lanes
    }

    fn lane_mut(&mut self, id: &TrackId) -> Result<&mut AudioLane<P>> {
        self.lanes
            .iter_mut()
            .find(|l| l.id == *id)
            .ok_or_else(|| MediaError::UnknownTrack(id.clone()))
    }

    /// The video surface
    pub fn surface(&self) -> &V {
        &self.surface
    }

    /// Mutable access to the video surface
    pub fn surface_mut(&mut self) -> &mut V {
        &mut self.surface
    }

    /// Shared transport
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Engine configuration
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Release every lane and pause the surface
    pub fn shutdown(&mut self) {
        for lane in &mut self.lanes {
            lane.player.release();
        }
        self.throttler.cancel_pending();
        if !self.surface.is_paused() {
            self.surface.pause();
        }
        info!(lanes = self.lanes.len(), "Sync session shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimTrackPool, SimVideoSurface};
    use crate::surface::AudioTrack;
    use dubsync_core::TransportState;

    fn session() -> SyncSession<SimVideoSurface, SimTrackPool> {
        let transport = Transport::new(TransportState::new(60.0).unwrap());
        SyncSession::new(SyncConfig::default(), transport, SimVideoSurface::new(60.0)).unwrap()
    }

    #[test]
    fn test_duplicate_lane_rejected() {
        let mut session = session();
        session
            .add_lane("dub".into(), Vec::new(), SimTrackPool::new())
            .unwrap();
        assert!(matches!(
            session.add_lane("dub".into(), Vec::new(), SimTrackPool::new()),
            Err(MediaError::DuplicateTrack(_))
        ));
    }

    #[test]
    fn test_replace_segments_unknown_track() {
        let mut session = session();
        assert!(matches!(
            session.replace_segments(&"nope".into(), Vec::new()),
            Err(MediaError::UnknownTrack(_))
        ));
    }

    #[test]
    fn test_rejected_play_reconciles_transport() {
        let mut session = session();
        let pool = SimTrackPool::new();
        pool.preload("A", "a-1", true);
        session
            .add_lane(
                "dub".into(),
                vec![Segment::new("A", 0.0, 5.0, "a-1")],
                pool.clone(),
            )
            .unwrap();
        session.surface_mut().reject_next_play();
        session.transport().write().play();
        session.tick(Instant::now());
        assert!(!session.transport().is_playing());
        assert_eq!(pool.sim_track(&"A".into()).unwrap().play_count(), 0);
    }

    #[test]
    fn test_shutdown_pauses_everything() {
        let mut session = session();
        let pool = SimTrackPool::new();
        let a = pool.preload("A", "a-1", true);
        session
            .add_lane(
                "dub".into(),
                vec![Segment::new("A", 0.0, 5.0, "a-1")],
                pool.clone(),
            )
            .unwrap();
        session.transport().write().play();
        session.tick(Instant::now());
        assert!(!a.is_paused());
        session.shutdown();
        assert!(a.is_paused());
        assert!(session.surface().is_paused());
    }
}
