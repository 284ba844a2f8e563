//! DubSync Media - Segmented Media Synchronization Engine
//!
//! This crate keeps one continuous video surface and a set of per-segment audio tracks
//! locked to the shared transport state:
//! - Media primitive contracts (video surface, audio track handles, track pools)
//! - Seek throttling with keyframe snapping while scrubbing
//! - Video sync controller (play/pause/seek reconciliation)
//! - Audio segment player (segment switching, hot-swap, drift correction)
//! - Session orchestrator wiring the above to one transport
//! - Simulated primitives for tests and headless replay

#![warn(missing_docs)]

use dubsync_core::{CoreError, TrackId};
use thiserror::Error;

pub mod audio_player;
pub mod session;
pub mod sim;
pub mod surface;
pub mod throttle;
pub mod video_sync;

pub use audio_player::{AudioSegmentPlayer, PlayerStats};
pub use session::{AudioLane, SyncSession};
pub use sim::{SimAudioTrack, SimTrackPool, SimVideoSurface, SurfaceCommand, TrackCommand};
pub use surface::{AudioTrack, AudioTrackPool, TrackHandle, VideoSurface};
pub use throttle::{resolve_keyframe, SeekCommand, SeekKind, SeekStats, SeekThrottler};
pub use video_sync::VideoSyncController;

/// Media errors
#[derive(Error, Debug)]
pub enum MediaError {
    /// The environment refused to start playback (e.g. blocked autoplay)
    #[error("Playback rejected: {0}")]
    PlayRejected(String),

    /// The surface cannot act before its duration and seekable range are known
    #[error("Media metadata not loaded")]
    MetadataNotLoaded,

    /// A media primitive failed
    #[error("Media primitive error: {0}")]
    Primitive(String),

    /// No audio lane with this id
    #[error("Unknown track: {0}")]
    UnknownTrack(TrackId),

    /// An audio lane with this id already exists
    #[error("Duplicate track: {0}")]
    DuplicateTrack(TrackId),

    /// Invalid timeline data
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for media operations
pub type Result<T> = std::result::Result<T, MediaError>;
