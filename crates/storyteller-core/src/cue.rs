//! Cue vocabulary and the dispatch seam.

use crate::audio::ClipId;

/// A single scheduled effect within a timeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Cue {
    /// Play an audio clip at the given volume.
    PlayAudio {
        /// The clip to play.
        clip: ClipId,
        /// Playback volume in `[0.0, 1.0]`.
        volume: f32,
    },
    /// Publish a visual state change to the render layer.
    SetVisualState {
        /// Visual element key (e.g. `start-button`).
        key: String,
        /// New value (e.g. a CSS class such as `fade-out`).
        value: String,
    },
    /// Open a named gate.
    Unlock {
        /// Gate name (e.g. `next-button`).
        gate: String,
    },
}

impl Cue {
    /// Returns the cue type name (for logging).
    #[must_use]
    pub fn cue_type(&self) -> &'static str {
        match self {
            Self::PlayAudio { .. } => "play_audio",
            Self::SetVisualState { .. } => "set_visual_state",
            Self::Unlock { .. } => "unlock",
        }
    }

    /// Convenience constructor for `PlayAudio`.
    #[must_use]
    pub fn play_audio(clip: impl Into<ClipId>, volume: f32) -> Self {
        Self::PlayAudio {
            clip: clip.into(),
            volume,
        }
    }

    /// Convenience constructor for `SetVisualState`.
    #[must_use]
    pub fn set_visual(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::SetVisualState {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Convenience constructor for `Unlock`.
    #[must_use]
    pub fn unlock(gate: impl Into<String>) -> Self {
        Self::Unlock { gate: gate.into() }
    }
}

/// Applies cues. Side effects are only observable through page state and
/// audio output; nothing is returned to the runner.
pub trait CueDispatcher: Send + Sync {
    /// Applies a single cue.
    fn dispatch(&self, cue: &Cue);
}
