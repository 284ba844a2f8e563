//! DubSync Core - Timeline Data Model and Transport State
//!
//! This crate contains the media-independent half of the synchronization engine:
//! - Segment model and the sorted segment index
//! - Shared transport state (playhead, play intent, scrubbing, rate)
//! - Session project description
//! - Engine and logging configuration

#![warn(missing_docs)]

use thiserror::Error;

pub mod config;
pub mod logging;
pub mod project;
pub mod segment;
pub mod segment_index;
pub mod transport;

// --- Re-exports grouped by category ---

// Timeline model
pub use project::{SessionProject, TrackSegments};
pub use segment::{AudioSourceRef, Segment, SegmentId, TimePoint, TrackId};
pub use segment_index::SegmentIndex;

// Transport
pub use transport::{Transport, TransportSnapshot, TransportState};

// Configuration
pub use config::SyncConfig;
pub use logging::LogConfig;

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    /// Segment bounds are not a valid half-open interval
    #[error("Invalid segment {id}: start {start} must be finite and before end {end}")]
    InvalidSegment {
        /// Offending segment
        id: SegmentId,
        /// Segment start in seconds
        start: TimePoint,
        /// Segment end in seconds
        end: TimePoint,
    },

    /// Two segments of one track overlap
    #[error("Segments {first} and {second} overlap")]
    OverlappingSegments {
        /// Earlier segment
        first: SegmentId,
        /// Later segment that starts before `first` ends
        second: SegmentId,
    },

    /// Two segments of one track share an id
    #[error("Duplicate segment id: {0}")]
    DuplicateSegment(SegmentId),

    /// Playback rate must be finite and strictly positive
    #[error("Invalid playback rate: {0}")]
    InvalidPlaybackRate(f64),

    /// A segment's audio rate must be finite and strictly positive
    #[error("Invalid playback rate {rate} on segment {id}")]
    InvalidSegmentRate {
        /// Offending segment
        id: SegmentId,
        /// Rejected rate
        rate: f64,
    },

    /// Timeline duration must be finite and non-negative
    #[error("Invalid duration: {0}")]
    InvalidDuration(f64),

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration could not be parsed
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Project could not be parsed
    #[error("Failed to parse project: {0}")]
    ProjectParse(#[from] serde_json::Error),

    /// I/O failure while reading a file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
