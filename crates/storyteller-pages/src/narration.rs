//! Narration playback with a single current clip.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use storyteller_core::audio::{AudioBackend, AudioHandle, ClipId};
use storyteller_sequencer::application::scope::TaskScope;
use tracing::{debug, info, warn};

/// Delay between replacing the current clip and starting the new one.
pub const START_DELAY: Duration = Duration::from_millis(200);

type Slot = Arc<Mutex<Option<Arc<dyn AudioHandle>>>>;

fn lock(slot: &Slot) -> MutexGuard<'_, Option<Arc<dyn AudioHandle>>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Plays narration clips one at a time. A new clip pauses the previous one.
pub struct NarrationPlayer {
    audio: Arc<dyn AudioBackend>,
    current: Slot,
    scope: TaskScope,
}

impl NarrationPlayer {
    #[must_use]
    pub fn new(audio: Arc<dyn AudioBackend>) -> Self {
        Self {
            audio,
            current: Arc::new(Mutex::new(None)),
            scope: TaskScope::new(),
        }
    }

    /// Makes `clip` the current narration and starts it after
    /// [`START_DELAY`], unless another clip replaces it first.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn play(&self, clip: &ClipId) {
        let handle = self.audio.open(clip);
        if let Some(previous) = lock(&self.current).replace(Arc::clone(&handle)) {
            debug!(clip = %previous.clip(), "previous narration paused");
            previous.pause();
        }

        let current = Arc::clone(&self.current);
        self.scope.spawn_after(START_DELAY, move || {
            let still_current = lock(&current)
                .as_ref()
                .is_some_and(|c| Arc::ptr_eq(c, &handle));
            if !still_current {
                debug!(clip = %handle.clip(), "narration superseded before start");
                return;
            }
            match handle.play() {
                Ok(()) => info!(clip = %handle.clip(), "narration started"),
                Err(e) => warn!(error = %e, "narration failed to start"),
            }
        });
    }

    /// The clip currently owning narration.
    #[must_use]
    pub fn current(&self) -> Option<ClipId> {
        lock(&self.current).as_ref().map(|h| h.clip().clone())
    }

    /// Pauses and forgets the current clip.
    pub fn stop(&self) {
        if let Some(handle) = lock(&self.current).take() {
            handle.pause();
        }
    }
}

impl Drop for NarrationPlayer {
    fn drop(&mut self) {
        self.scope.close();
        self.stop();
    }
}

impl std::fmt::Debug for NarrationPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrationPlayer")
            .field("current", &self.current())
            .finish_non_exhaustive()
    }
}
