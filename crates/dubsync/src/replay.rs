//! Headless replay of scripted sessions
//!
//! Drives a `SyncSession` over simulated media from a timed action script. The virtual
//! clock starts when the replayer is created; each step runs at `at_ms` after that,
//! and the session ticks after every step and at every throttle deadline in between.

use anyhow::{anyhow, bail, Context, Result};
use dubsync_core::{
    SegmentId, SessionProject, SyncConfig, TimePoint, TrackId, Transport, TransportSnapshot,
    TransportState,
};
use dubsync_media::{
    PlayerStats, SeekStats, SimTrackPool, SimVideoSurface, SurfaceCommand, SyncSession,
    TrackCommand, VideoSurface,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Granularity of simulated native playback
const FRAME: Duration = Duration::from_millis(16);

/// One user action or media event
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Start playback
    Play,
    /// Pause playback
    Pause,
    /// Jump to an absolute time
    Seek {
        /// Target in seconds
        time: TimePoint,
    },
    /// Jump relative to the playhead
    Skip {
        /// Offset in seconds, may be negative
        delta: TimePoint,
    },
    /// Start a scrub gesture
    BeginScrub {
        /// Initial playhead
        time: TimePoint,
    },
    /// Move the playhead during a scrub gesture
    ScrubTo {
        /// New playhead
        time: TimePoint,
    },
    /// Release the scrub gesture
    EndScrub,
    /// Change the global playback rate
    SetRate {
        /// New rate
        rate: f64,
    },
    /// New audio was generated for a segment
    Regenerate {
        /// Lane holding the segment
        track: TrackId,
        /// Regenerated segment
        segment: SegmentId,
        /// New audio source reference
        source: String,
        /// Whether the new track is buffered right away
        #[serde(default = "default_ready")]
        ready: bool,
        /// Whether the preloader builds the new track together with the edit. When
        /// false only the segment changes and a later `preload` step supplies the track.
        #[serde(default = "default_ready")]
        preload: bool,
    },
    /// The preloader built a track for a segment
    Preload {
        /// Lane holding the segment
        track: TrackId,
        /// Segment the track belongs to
        segment: SegmentId,
        /// Audio source the track was built from
        source: String,
        /// Whether the track is buffered right away
        #[serde(default = "default_ready")]
        ready: bool,
    },
    /// A preloaded track finished buffering
    TrackReady {
        /// Lane holding the segment
        track: TrackId,
        /// Segment whose track became ready
        segment: SegmentId,
    },
    /// Let native playback run
    Advance {
        /// Milliseconds of playback
        ms: u64,
    },
}

fn default_ready() -> bool {
    true
}

/// A timed step
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Step {
    /// Milliseconds since the start of the replay
    pub at_ms: u64,
    /// What happens
    pub action: Action,
}

/// A replay script
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Script {
    /// Steps, run in order
    pub steps: Vec<Step>,
}

impl Script {
    /// Parse a JSON script
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse replay script")
    }

    /// Load a JSON script file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read script: {:?}", path))?;
        Self::from_json_str(&text)
    }
}

/// Video side of the report
#[derive(Debug, Serialize)]
pub struct VideoReport {
    /// Commands received by the surface
    pub commands: Vec<SurfaceCommand>,
    /// Final surface position
    pub position: TimePoint,
    /// Whether the surface ended paused
    pub paused: bool,
    /// Throttler statistics
    pub seek_stats: SeekStats,
}

/// One audio lane in the report
#[derive(Debug, Serialize)]
pub struct TrackReport {
    /// Lane id
    pub id: TrackId,
    /// Segment bound at the end of the replay
    pub current_segment: Option<SegmentId>,
    /// First segment starting after the final playhead
    pub upcoming_segment: Option<SegmentId>,
    /// Player statistics
    pub stats: PlayerStats,
    /// Commands received by every track of the lane
    pub commands: BTreeMap<SegmentId, Vec<TrackCommand>>,
}

/// Outcome of a replay
#[derive(Debug, Serialize)]
pub struct ReplayReport {
    /// Project name
    pub project: String,
    /// Steps executed
    pub steps: usize,
    /// Final transport state
    pub transport: TransportSnapshot,
    /// Video surface outcome
    pub video: VideoReport,
    /// Audio lanes outcome
    pub tracks: Vec<TrackReport>,
}

/// Scripted driver over simulated media
pub struct Replayer {
    project: String,
    session: SyncSession<SimVideoSurface, SimTrackPool>,
    pools: BTreeMap<TrackId, SimTrackPool>,
    start: Instant,
    clock: Instant,
    steps: usize,
}

impl Replayer {
    /// Build a session for `project`, preloading every segment's audio as ready
    pub fn new(project: &SessionProject, config: SyncConfig) -> Result<Self> {
        let transport = Transport::new(TransportState::new(project.duration)?);
        let mut session = SyncSession::new(config, transport, SimVideoSurface::new(project.duration))?;
        let mut pools = BTreeMap::new();

        for track in &project.tracks {
            let pool = SimTrackPool::new();
            for segment in &track.segments {
                pool.preload(segment.id.clone(), segment.audio_source.clone(), true);
            }
            session.add_lane(track.id.clone(), track.segments.clone(), pool.clone())?;
            pools.insert(track.id.clone(), pool);
        }

        let start = Instant::now();
        session.tick(start);
        info!(
            project = %project.name,
            tracks = pools.len(),
            "Replayer ready"
        );
        Ok(Self {
            project: project.name.clone(),
            session,
            pools,
            start,
            clock: start,
            steps: 0,
        })
    }

    /// Run every step of `script`
    pub fn run(&mut self, script: &Script) -> Result<()> {
        for step in &script.steps {
            let at = (self.start + Duration::from_millis(step.at_ms)).max(self.clock);
            self.drain_deadlines(at);
            self.clock = at;
            debug!(at_ms = step.at_ms, action = ?step.action, "Replaying step");
            self.apply(&step.action)
                .with_context(|| format!("Step at {} ms failed", step.at_ms))?;
            self.session.tick(self.clock);
            self.steps += 1;
        }
        // Let the last trailing seek land
        if let Some(deadline) = self.session.next_deadline() {
            self.drain_deadlines(deadline);
        }
        Ok(())
    }

    fn apply(&mut self, action: &Action) -> Result<()> {
        let transport = self.session.transport().clone();
        match action {
            Action::Play => transport.write().play(),
            Action::Pause => transport.write().pause(),
            Action::Seek { time } => transport.write().seek(*time),
            Action::Skip { delta } => transport.write().skip(*delta),
            Action::BeginScrub { time } => transport.write().begin_scrub(*time),
            Action::ScrubTo { time } => transport.write().scrub_to(*time),
            Action::EndScrub => transport.write().end_scrub(),
            Action::SetRate { rate } => transport.write().set_playback_rate(*rate)?,
            Action::Regenerate {
                track,
                segment,
                source,
                ready,
                preload,
            } => self.regenerate(track, segment, source, preload.then_some(*ready))?,
            Action::Preload {
                track,
                segment,
                source,
                ready,
            } => {
                self.pool(track)?.preload(segment.clone(), source.as_str(), *ready);
                if *ready {
                    let committed = self.session.on_track_ready(track, segment, self.clock)?;
                    debug!(%track, %segment, committed, "Preloaded ready track");
                }
            }
            Action::TrackReady { track, segment } => {
                self.pool(track)?.set_ready(segment, true);
                let committed = self.session.on_track_ready(track, segment, self.clock)?;
                debug!(%track, %segment, committed, "Track ready");
            }
            Action::Advance { ms } => self.advance(*ms),
        }
        Ok(())
    }

    fn regenerate(
        &mut self,
        track: &TrackId,
        segment: &SegmentId,
        source: &str,
        preload: Option<bool>,
    ) -> Result<()> {
        let lane = self
            .session
            .lane(track)
            .ok_or_else(|| anyhow!("Unknown track: {}", track))?;
        if lane.index().get(segment).is_none() {
            bail!("Unknown segment {} on track {}", segment, track);
        }
        let segments = lane
            .index()
            .iter()
            .cloned()
            .map(|mut s| {
                if s.id == *segment {
                    s.audio_source = source.into();
                }
                s
            })
            .collect();

        if let Some(ready) = preload {
            self.pool(track)?.preload(segment.clone(), source, ready);
        }
        self.session.replace_segments(track, segments)?;
        Ok(())
    }

    fn advance(&mut self, ms: u64) {
        let end = self.clock + Duration::from_millis(ms);
        while self.clock < end {
            let next = (self.clock + FRAME).min(end);
            self.drain_deadlines(next);
            let dt = next.duration_since(self.clock).as_secs_f64();
            self.clock = next;

            let ended = self.session.surface_mut().advance(dt);
            for pool in self.pools.values() {
                pool.advance_all(dt);
            }
            self.session.on_surface_time_update();
            if ended {
                self.session.on_surface_ended();
            }
            self.session.tick(self.clock);
        }
    }

    fn drain_deadlines(&mut self, until: Instant) {
        while let Some(deadline) = self.session.next_deadline().filter(|d| *d <= until) {
            let deadline = deadline.max(self.clock);
            self.clock = deadline;
            self.session.tick(deadline);
        }
    }

    fn pool(&self, track: &TrackId) -> Result<&SimTrackPool> {
        self.pools
            .get(track)
            .ok_or_else(|| anyhow!("Unknown track: {}", track))
    }

    /// Snapshot the outcome so far
    pub fn report(&self) -> ReplayReport {
        let surface = self.session.surface();
        let transport = self.session.transport().snapshot();
        ReplayReport {
            project: self.project.clone(),
            steps: self.steps,
            transport,
            video: VideoReport {
                commands: surface.commands().to_vec(),
                position: surface.current_time(),
                paused: surface.is_paused(),
                seek_stats: self.session.seek_stats(),
            },
            tracks: self
                .session
                .lanes()
                .iter()
                .map(|lane| TrackReport {
                    id: lane.id().clone(),
                    current_segment: lane.player().current_segment().cloned(),
                    upcoming_segment: lane
                        .index()
                        .next_after(transport.playhead)
                        .map(|s| s.id.clone()),
                    stats: lane.stats(),
                    commands: lane.pool().command_logs().into_iter().collect(),
                })
                .collect(),
        }
    }

    /// Report, then release the session
    pub fn finish(mut self) -> ReplayReport {
        let report = self.report();
        self.session.shutdown();
        report
    }
}
