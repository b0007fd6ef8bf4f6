//! Fake audio: in-memory `AudioBackend` and `AudioHandle` for tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use storyteller_core::audio::{AudioBackend, AudioHandle, ClipId, PlaybackError};

#[derive(Debug)]
struct HandleState {
    volume: f32,
    looping: bool,
    paused: bool,
    position: Duration,
    play_count: usize,
    volume_history: Vec<f32>,
}

/// An audio handle that records every request. When created by a blocking
/// backend, every `play` is refused as if by an autoplay policy.
#[derive(Debug)]
pub struct FakeAudioHandle {
    clip: ClipId,
    blocked: bool,
    state: Mutex<HandleState>,
}

impl FakeAudioHandle {
    /// Creates a paused handle at full volume.
    #[must_use]
    pub fn new(clip: ClipId, blocked: bool) -> Self {
        Self {
            clip,
            blocked,
            state: Mutex::new(HandleState {
                volume: 1.0,
                looping: false,
                paused: true,
                position: Duration::ZERO,
                play_count: 0,
                volume_history: Vec::new(),
            }),
        }
    }

    /// Number of accepted `play` requests.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn play_count(&self) -> usize {
        self.state.lock().unwrap().play_count
    }

    /// Every volume set on this handle, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn volume_history(&self) -> Vec<f32> {
        self.state.lock().unwrap().volume_history.clone()
    }

    /// Whether looping was enabled.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn is_looping(&self) -> bool {
        self.state.lock().unwrap().looping
    }

    /// Simulates playback progress.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn advance(&self, elapsed: Duration) {
        self.state.lock().unwrap().position += elapsed;
    }
}

impl AudioHandle for FakeAudioHandle {
    fn clip(&self) -> &ClipId {
        &self.clip
    }

    fn play(&self) -> Result<(), PlaybackError> {
        if self.blocked {
            return Err(PlaybackError::Blocked {
                clip: self.clip.clone(),
                reason: "autoplay not allowed".to_owned(),
            });
        }
        let mut state = self.state.lock().unwrap();
        state.paused = false;
        state.play_count += 1;
        Ok(())
    }

    fn pause(&self) {
        self.state.lock().unwrap().paused = true;
    }

    fn volume(&self) -> f32 {
        self.state.lock().unwrap().volume
    }

    fn set_volume(&self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        let mut state = self.state.lock().unwrap();
        state.volume = volume;
        state.volume_history.push(volume);
    }

    fn set_looping(&self, looping: bool) {
        self.state.lock().unwrap().looping = looping;
    }

    fn rewind(&self) {
        self.state.lock().unwrap().position = Duration::ZERO;
    }

    fn is_paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }

    fn position(&self) -> Duration {
        self.state.lock().unwrap().position
    }
}

/// An audio backend that hands out `FakeAudioHandle`s and remembers them.
#[derive(Debug, Default)]
pub struct FakeAudioBackend {
    blocked: bool,
    opened: Mutex<Vec<Arc<FakeAudioHandle>>>,
}

impl FakeAudioBackend {
    /// Creates a backend whose handles accept playback.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend whose handles refuse every `play`.
    #[must_use]
    pub fn blocking() -> Self {
        Self {
            blocked: true,
            opened: Mutex::new(Vec::new()),
        }
    }

    /// The most recently opened handle for `clip`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn handle(&self, clip: &str) -> Option<Arc<FakeAudioHandle>> {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|h| h.clip.as_str() == clip)
            .cloned()
    }

    /// Total number of handles opened.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn open_count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }
}

impl AudioBackend for FakeAudioBackend {
    fn open(&self, clip: &ClipId) -> Arc<dyn AudioHandle> {
        let handle = Arc::new(FakeAudioHandle::new(clip.clone(), self.blocked));
        self.opened.lock().unwrap().push(Arc::clone(&handle));
        handle
    }
}
