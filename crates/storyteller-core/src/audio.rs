//! Audio playback abstraction.
//!
//! Handles use interior mutability: the same clip handle is shared between the
//! dispatcher that starts it and the controllers that fade or stop it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of an audio clip (asset name or URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClipId(String);

impl ClipId {
    /// Creates a clip identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClipId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Reasons a playback request can be refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlaybackError {
    /// The platform refused to start playback (autoplay policy).
    #[error("playback of {clip} blocked: {reason}")]
    Blocked {
        /// The clip that was refused.
        clip: ClipId,
        /// Platform-provided reason.
        reason: String,
    },
}

/// A playable audio element.
pub trait AudioHandle: Send + Sync + fmt::Debug {
    /// The clip this handle plays.
    fn clip(&self) -> &ClipId;

    /// Requests playback. Returns as soon as the request is accepted or
    /// refused; it never waits for the clip to finish.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError` if the platform refuses playback.
    fn play(&self) -> Result<(), PlaybackError>;

    /// Pauses playback, keeping the current position.
    fn pause(&self);

    /// Current volume in `[0.0, 1.0]`.
    fn volume(&self) -> f32;

    /// Sets the volume; implementations clamp to `[0.0, 1.0]`.
    fn set_volume(&self, volume: f32);

    /// Enables or disables looping.
    fn set_looping(&self, looping: bool);

    /// Moves the playback position back to the start.
    fn rewind(&self);

    /// Whether playback is currently paused (or never started).
    fn is_paused(&self) -> bool;

    /// Current playback position.
    fn position(&self) -> Duration;
}

/// Opens audio handles for clips.
pub trait AudioBackend: Send + Sync {
    /// Opens a fresh handle for `clip`.
    fn open(&self, clip: &ClipId) -> Arc<dyn AudioHandle>;
}

/// Pauses `handle` and rewinds it to position zero.
pub fn stop(handle: &dyn AudioHandle) {
    handle.pause();
    handle.rewind();
}
