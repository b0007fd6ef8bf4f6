//! Timelines: ordered, validated `(offset, cue)` sequences.

use std::time::Duration;

use storyteller_core::audio::ClipId;
use storyteller_core::cue::Cue;
use storyteller_core::error::SequencerError;

/// A cue together with its offset from the start of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedCue {
    /// Offset from the run's start instant.
    pub offset: Duration,
    /// The effect to apply.
    pub cue: Cue,
}

/// A non-empty sequence of cues with non-decreasing offsets. Cues sharing an
/// offset keep their declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    cues: Vec<TimedCue>,
}

#[allow(clippy::cast_possible_truncation)]
fn millis(offset: Duration) -> u64 {
    offset.as_millis() as u64
}

impl Timeline {
    /// Creates a timeline from `(offset, cue)` pairs.
    ///
    /// # Errors
    ///
    /// Returns `SequencerError::EmptyTimeline` if `cues` is empty and
    /// `SequencerError::NonMonotonicOffset` if an offset is smaller than the
    /// one declared before it.
    pub fn new(cues: Vec<(Duration, Cue)>) -> Result<Self, SequencerError> {
        if cues.is_empty() {
            return Err(SequencerError::EmptyTimeline);
        }
        for (index, pair) in cues.windows(2).enumerate() {
            if pair[1].0 < pair[0].0 {
                return Err(SequencerError::NonMonotonicOffset {
                    index: index + 1,
                    offset_ms: millis(pair[1].0),
                    previous_ms: millis(pair[0].0),
                });
            }
        }
        Ok(Self {
            cues: cues
                .into_iter()
                .map(|(offset, cue)| TimedCue { offset, cue })
                .collect(),
        })
    }

    /// Starts a builder.
    #[must_use]
    pub fn builder() -> TimelineBuilder {
        TimelineBuilder::default()
    }

    /// The cues in firing order.
    #[must_use]
    pub fn cues(&self) -> &[TimedCue] {
        &self.cues
    }

    /// Number of cues. Never zero.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cues.len()
    }

    /// Always `false`; timelines are non-empty by construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Offset of the last cue.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.cues.last().map_or(Duration::ZERO, |c| c.offset)
    }

    /// Shifts every cue later by `delay`.
    #[must_use]
    pub fn delayed_by(mut self, delay: Duration) -> Self {
        for timed in &mut self.cues {
            timed.offset += delay;
        }
        self
    }

    /// Appends `next`, measuring its offsets from `at`.
    ///
    /// # Errors
    ///
    /// Returns `SequencerError::NonMonotonicOffset` if `next` would start
    /// before this timeline's last cue.
    pub fn followed_by(self, next: Timeline, at: Duration) -> Result<Self, SequencerError> {
        let pairs = self
            .cues
            .into_iter()
            .chain(next.delayed_by(at).cues)
            .map(|timed| (timed.offset, timed.cue))
            .collect();
        Self::new(pairs)
    }
}

/// Fluent builder for `Timeline`. Offsets are given in milliseconds.
#[derive(Debug, Default)]
pub struct TimelineBuilder {
    cues: Vec<(Duration, Cue)>,
}

impl TimelineBuilder {
    /// Adds `cue` at `offset_ms`.
    #[must_use]
    pub fn at(mut self, offset_ms: u64, cue: Cue) -> Self {
        self.cues.push((Duration::from_millis(offset_ms), cue));
        self
    }

    /// Adds a `PlayAudio` cue.
    #[must_use]
    pub fn play_audio(self, offset_ms: u64, clip: impl Into<ClipId>, volume: f32) -> Self {
        self.at(offset_ms, Cue::play_audio(clip, volume))
    }

    /// Adds a `SetVisualState` cue.
    #[must_use]
    pub fn set_visual(self, offset_ms: u64, key: &str, value: &str) -> Self {
        self.at(offset_ms, Cue::set_visual(key, value))
    }

    /// Adds an `Unlock` cue.
    #[must_use]
    pub fn unlock(self, offset_ms: u64, gate: &str) -> Self {
        self.at(offset_ms, Cue::unlock(gate))
    }

    /// Validates and builds the timeline.
    ///
    /// # Errors
    ///
    /// See [`Timeline::new`].
    pub fn build(self) -> Result<Timeline, SequencerError> {
        Timeline::new(self.cues)
    }
}
