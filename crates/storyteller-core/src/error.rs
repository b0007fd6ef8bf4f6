//! Sequencer error types.

use thiserror::Error;

use crate::audio::PlaybackError;

/// Top-level error type for timelines, gates and shared resources.
#[derive(Debug, Error)]
pub enum SequencerError {
    /// A timeline was built without any cues.
    #[error("timeline must contain at least one cue")]
    EmptyTimeline,

    /// A cue was declared earlier than the cue before it.
    #[error("cue {index} at {offset_ms}ms precedes the previous cue at {previous_ms}ms")]
    NonMonotonicOffset {
        /// Position of the offending cue.
        index: usize,
        /// Offset of the offending cue.
        offset_ms: u64,
        /// Offset of the cue declared before it.
        previous_ms: u64,
    },

    /// An action was requested before its gate was unlocked.
    #[error("gate is still locked: {0}")]
    GateLocked(String),

    /// A page tried to drive the shared background track without owning it.
    #[error("background audio is owned by another page")]
    NotAudioOwner,

    /// Audio playback was refused.
    #[error(transparent)]
    Playback(#[from] PlaybackError),

    /// A browser capability the page needs is not available.
    #[error("unsupported capability: {0}")]
    UnsupportedCapability(String),
}
